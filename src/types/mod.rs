mod block;
mod models;
mod role;

pub use block::{BlockInput, ContentBlock, MediaBlock, validate_blocks};
pub use models::*;
pub use role::{MemberRole, Role};

/// Declares a fieldless enum stored and serialized as an uppercase code.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(#[serde(rename = $code)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Parses a code case-insensitively, ignoring surrounding whitespace.
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($code) {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or_else(|| format!("invalid {}: {s}", stringify!($name)))
            }
        }
    };
}

pub(crate) use code_enum;

code_enum! {
    pub enum UserStatus {
        Active => "ACTIVE",
        Disabled => "DISABLED",
    }
}

code_enum! {
    /// PRIVATE groups are created by admins; SYSTEM groups mirror a global role.
    pub enum GroupVisibility {
        Private => "PRIVATE",
        System => "SYSTEM",
    }
}

code_enum! {
    pub enum MemberStatus {
        Active => "ACTIVE",
    }
}

code_enum! {
    pub enum ResourceStatus {
        Draft => "DRAFT",
        Published => "PUBLISHED",
        Archived => "ARCHIVED",
    }
}

code_enum! {
    pub enum MediaBucket {
        Users => "users",
        Resources => "resources",
    }
}

code_enum! {
    pub enum MediaKind {
        Avatar => "AVATAR",
        Image => "IMAGE",
        Document => "DOCUMENT",
        Other => "OTHER",
    }
}

code_enum! {
    pub enum MediaStatus {
        Ready => "READY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ResourceStatus::parse("published"), Some(ResourceStatus::Published));
        assert_eq!(ResourceStatus::parse(" Draft "), Some(ResourceStatus::Draft));
        assert_eq!(ResourceStatus::parse("deleted"), None);
    }

    #[test]
    fn test_lowercase_codes() {
        assert_eq!(MediaBucket::Users.as_str(), "users");
        assert_eq!(MediaBucket::parse("RESOURCES"), Some(MediaBucket::Resources));
        assert_eq!(MediaBucket::parse("media"), None);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&GroupVisibility::System).unwrap();
        assert_eq!(json, "\"SYSTEM\"");
        let parsed: UserStatus = serde_json::from_str("\"DISABLED\"").unwrap();
        assert_eq!(parsed, UserStatus::Disabled);
    }
}
