//! Market entities
//!
//! Status changes go through methods on the entity. Each returns the status it
//! left so the repository can persist the change only if nobody moved the
//! record in between.

/// Enum stored and serialised as an upper-case code
macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $code)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

pub mod case;
pub mod conversation;
pub mod listing;
pub mod notification;
pub mod order;
pub mod review;
pub mod testimonial;
pub mod withdrawal;

#[cfg(test)]
mod tests {
    use super::listing::ListingStatus;
    use super::order::OrderStatus;

    #[test]
    fn test_codes_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(status.code()), Some(*status));
        }
        assert_eq!(ListingStatus::from_code("pending"), None);
        assert_eq!(
            serde_json::to_string(&ListingStatus::Approved).unwrap(),
            "\"APPROVED\""
        );
    }
}
