//! Data models for Gearloan

/// Implements sqlx text-column conversions for an enum exposing
/// `as_str()` and `FromStr<Err = String>`.
macro_rules! text_column_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod borrowing;
pub mod item;
pub mod scan;
pub mod user;

// Re-export commonly used types
pub use borrowing::{Borrowing, BorrowingDetails, BorrowingStatus, LendingStats, NewBorrowing};
pub use item::{Item, ItemStatus, NewItem};
pub use scan::{BorrowIntent, LookupResult, ScanStatus};
pub use user::{NewUser, User, UserClaims, UserRole, UserShort};
