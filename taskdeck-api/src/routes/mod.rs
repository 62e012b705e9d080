/// Route handlers
///
/// One module per resource. Every mutating handler opens a transaction on
/// the pool, threads the connection through the repositories, and commits
/// before serializing the response; an early `?` return drops the
/// transaction and rolls it back.

use serde::{Deserialize, Deserializer, Serialize};

pub mod accounts;
pub mod auth;
pub mod health;
pub mod profile;
pub mod tasks;
pub mod watch_tasks;

/// Uniform `{"detail": ...}` success body
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Detail {
            detail: detail.into(),
        }
    }
}

/// Deserializes a patch field that distinguishes "absent" from "null".
///
/// Plain `Option<Option<T>>` collapses JSON `null` to the outer `None`, so
/// nullable patch fields use `#[serde(default, deserialize_with =
/// "double_option")]`: an absent key stays `None`, an explicit `null`
/// becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        nickname: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert!(absent.nickname.is_none());

        let null: Patch = serde_json::from_str(r#"{"nickname": null}"#).unwrap();
        assert_eq!(null.nickname, Some(None));

        let set: Patch = serde_json::from_str(r#"{"nickname": "deck"}"#).unwrap();
        assert_eq!(set.nickname, Some(Some("deck".to_string())));
    }
}
