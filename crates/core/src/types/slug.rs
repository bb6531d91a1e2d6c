//! URL slug type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when deriving or parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input has no letters or digits to build a slug from.
    #[error("slug cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters outside `[a-z0-9-]` or misplaced hyphens.
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidFormat,
}

/// A URL-safe identifier derived from a display name.
///
/// ## Constraints
///
/// - Length: 1-255 characters
/// - Only `a-z`, `0-9` and `-`
/// - No leading, trailing or doubled hyphens
///
/// ## Examples
///
/// ```
/// use shopdesk_core::Slug;
///
/// assert_eq!(Slug::from_name("Summer Sale 2024").unwrap().as_str(), "summer-sale-2024");
/// assert_eq!(Slug::from_name("Fish & Chips").unwrap().as_str(), "fish-chips");
/// assert_eq!(Slug::from_name("hello@world").unwrap().as_str(), "hello-at-world");
/// assert!(Slug::from_name("!!!").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Maximum length of a slug (column width).
    pub const MAX_LENGTH: usize = 255;

    /// Derive a slug from a display name.
    ///
    /// `@` reads as `at`, underscores and whitespace separate words, other
    /// punctuation is dropped rather than turned into a separator (so
    /// `Tom's` becomes `toms`). Non-ASCII letters are transliterated.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing alphanumeric remains.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut prepared = String::with_capacity(name.len());
        for c in name.chars() {
            match c {
                '@' => prepared.push_str(" at "),
                '_' | '-' => prepared.push(' '),
                c if c.is_alphanumeric() || c.is_whitespace() => prepared.push(c),
                _ => {}
            }
        }

        let mut slug = ::slug::slugify(prepared);
        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        if slug.len() > Self::MAX_LENGTH {
            slug.truncate(Self::MAX_LENGTH);
            while slug.ends_with('-') {
                slug.pop();
            }
        }
        Ok(Self(slug))
    }

    /// Parse an already-formed slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or not in
    /// `[a-z0-9]+(-[a-z0-9]+)*` form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let well_formed = s
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        if !well_formed {
            return Err(SlugError::InvalidFormat);
        }
        Ok(Self(s.to_owned()))
    }

    /// The slug with a numeric suffix, e.g. `shoes-2`.
    ///
    /// The base is shortened when needed so the result still fits
    /// [`Self::MAX_LENGTH`].
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        let suffix = format!("-{n}");
        let mut base = self.0.clone();
        let room = Self::MAX_LENGTH.saturating_sub(suffix.len());
        if base.len() > room {
            base.truncate(room);
            while base.ends_with('-') {
                base.pop();
            }
        }
        Self(base + &suffix)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Rows written before slug rules tightened are still readable.
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
