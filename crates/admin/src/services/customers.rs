//! Customer management.

use tracing::{info, instrument};

use shopdesk_core::CustomerId;

use super::{ServiceError, clean, present, taken};
use crate::db::Store;
use crate::models::{Customer, CustomerData, CustomerInput, ListQuery, Page, SelectOption};
use crate::resources::Resource;

/// Customer operations over a store.
pub struct CustomerService<'a> {
    store: &'a dyn Store,
}

impl<'a> CustomerService<'a> {
    /// Create a new customer service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// List customers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Customer>, ServiceError> {
        Ok(self.store.list_customers(query).await?)
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the customer does not exist.
    pub async fn get(&self, id: CustomerId) -> Result<Customer, ServiceError> {
        self.store
            .get_customer(id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for invalid input or a taken email.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CustomerInput) -> Result<Customer, ServiceError> {
        let data = self.customer_data(input, None).await?;
        let customer = self.store.insert_customer(&data).await?;
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Replace a customer's fields.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Validation`.
    #[instrument(skip(self, input), fields(customer_id = %id))]
    pub async fn update(
        &self,
        id: CustomerId,
        input: &CustomerInput,
    ) -> Result<Customer, ServiceError> {
        self.get(id).await?;
        let data = self.customer_data(input, Some(id)).await?;
        let customer = self.store.update_customer(id, &data).await?;
        info!("Customer updated");
        Ok(customer)
    }

    /// Delete a customer together with their orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the customer does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<(), ServiceError> {
        self.get(id).await?;
        self.store.delete_customers(&[id]).await?;
        info!(customer_id = %id, "Customer deleted");
        Ok(())
    }

    /// Delete several customers. Unknown IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    #[instrument(skip(self))]
    pub async fn bulk_delete(&self, ids: &[CustomerId]) -> Result<u64, ServiceError> {
        let deleted = self.store.delete_customers(ids).await?;
        info!(deleted, "Customers bulk deleted");
        Ok(deleted)
    }

    /// Customers as select options.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn options(&self) -> Result<Vec<SelectOption>, ServiceError> {
        Ok(self.store.customer_options().await?)
    }

    async fn customer_data(
        &self,
        input: &CustomerInput,
        id: Option<CustomerId>,
    ) -> Result<CustomerData, ServiceError> {
        let mut errors = Resource::Customers
            .schema()
            .form
            .validate_input(input)
            .err()
            .unwrap_or_default();

        let email = clean(input.email.as_deref()).map(|e| e.to_lowercase());
        if let Some(email) = &email
            && !errors.has("email")
            && self.store.email_taken(email, id).await?
        {
            errors.add("email", taken("email"));
        }
        errors.into_result()?;

        Ok(CustomerData {
            name: present(clean(input.name.as_deref()), "name")?,
            email: present(email, "email")?,
            phone: clean(input.phone.as_deref()),
        })
    }
}
