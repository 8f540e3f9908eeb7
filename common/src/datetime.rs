//! Date and time utilities.

use std::{marker::PhantomData, time::Duration};

use derive_more::Debug;
use time::format_description::well_known::Rfc3339;

/// Untyped date and time.
pub type DateTime = DateTimeOf;

/// UTC date and time with a second precision.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Inner representation of the date and time.
    inner: time::OffsetDateTime,

    /// Type parameter describing the kind of date and time.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// Creates a new [`DateTime`] representing the current date and time.
    ///
    /// Sub-second part is truncated, so the value survives a round trip
    /// through [`DateTimeOf::unix_timestamp()`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        let inner = time::OffsetDateTime::now_utc();
        Self {
            _of: PhantomData,
            inner: inner.replace_nanosecond(0).expect("infallible"),
        }
    }

    /// Creates a new [`DateTime`] from the provided Unix timestamp.
    ///
    /// [`None`] is returned if the timestamp is out of range.
    #[must_use]
    pub fn from_unix_timestamp(timestamp: i64) -> Option<Self> {
        Some(Self {
            inner: time::OffsetDateTime::from_unix_timestamp(timestamp).ok()?,
            _of: PhantomData,
        })
    }

    /// Returns the Unix timestamp of this [`DateTime`].
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Returns the [`DateTime`] as an [RFC 3339] string.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner.format(&Rfc3339).unwrap_or_else(|e| {
            panic!("cannot format `DateTime` as RFC 3339: {e}")
        })
    }

    /// Adds the provided [`Duration`] to this [`DateTime`].
    ///
    /// [`None`] is returned if the result is out of the supported range.
    #[must_use]
    pub fn checked_add(self, rhs: Duration) -> Option<Self> {
        Some(Self {
            inner: self.inner.checked_add(rhs.try_into().ok()?)?,
            _of: PhantomData,
        })
    }

    /// Subtracts the provided [`Duration`] from this [`DateTime`].
    ///
    /// [`None`] is returned if the result is out of the supported range.
    #[must_use]
    pub fn checked_sub(self, rhs: Duration) -> Option<Self> {
        Some(Self {
            inner: self.inner.checked_sub(rhs.try_into().ok()?)?,
            _of: PhantomData,
        })
    }

    /// Coerces one kind of [`DateTime`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

pub mod serde {
    //! Module providing integration with [`serde`] crate.

    use super::DateTimeOf;

    pub mod unix_timestamp {
        //! Module providing serialization and deserialization of [`DateTimeOf`]
        //! as a Unix timestamp.

        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            Of: ?Sized,
        {
            serializer.serialize_i64(dt.unix_timestamp())
        }

        /// Deserializes the Unix timestamp into a [`DateTimeOf`].
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn deserialize<'de, D, Of>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            D: Deserializer<'de>,
            Of: ?Sized,
        {
            DateTimeOf::from_unix_timestamp(i64::deserialize(deserializer)?)
                .ok_or_else(|| Error::custom("invalid timestamp"))
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use super::DateTime;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Claims {
        #[serde(with = "super::serde::unix_timestamp")]
        exp: DateTime,
    }

    #[test]
    fn now_has_second_precision() {
        let now = DateTime::now();

        assert_eq!(
            DateTime::from_unix_timestamp(now.unix_timestamp()).unwrap(),
            now,
        );
    }

    #[test]
    fn arithmetic() {
        let epoch = DateTime::from_unix_timestamp(0).unwrap();
        let later = epoch.checked_add(Duration::from_secs(90)).unwrap();

        assert_eq!(later.unix_timestamp(), 90);
        assert_eq!(later.checked_sub(Duration::from_secs(90)), Some(epoch));
        assert_eq!(later.checked_add(Duration::MAX), None);
        assert_eq!(
            later.checked_add(Duration::from_secs(400_000 * 365 * 86_400)),
            None,
        );
        assert_eq!(later.to_rfc3339(), "1970-01-01T00:01:30Z");
    }

    #[test]
    fn serializes_as_unix_timestamp() {
        let claims = Claims {
            exp: DateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(json, r#"{"exp":1700000000}"#);
        assert_eq!(serde_json::from_str::<Claims>(&json).unwrap(), claims);
    }
}
