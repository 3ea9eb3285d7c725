//! Identity preferences (nickname and anonymity toggle).

use std::sync::Arc;

use futures::{Stream, StreamExt};
use reportline_common::AppResult;
use serde_json::Value;

use super::preferences::{PreferenceMap, PreferenceStore};
use crate::models::UserIdentity;

/// Preference namespace holding the identity.
pub const IDENTITY_NAMESPACE: &str = "identity";

const NICKNAME_KEY: &str = "nickname";
const ANONYMOUS_KEY: &str = "anonymous";

/// Typed view of the identity namespace.
#[derive(Clone)]
pub struct IdentityPreferences {
    store: Arc<PreferenceStore>,
}

impl IdentityPreferences {
    #[must_use]
    pub const fn new(store: Arc<PreferenceStore>) -> Self {
        Self { store }
    }

    fn from_map(map: &PreferenceMap) -> UserIdentity {
        let defaults = UserIdentity::default();
        UserIdentity {
            nickname: map
                .get(NICKNAME_KEY)
                .and_then(Value::as_str)
                .map_or(defaults.nickname, str::to_string),
            anonymous: map
                .get(ANONYMOUS_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.anonymous),
        }
    }

    /// Point-in-time identity.
    #[must_use]
    pub fn current(&self) -> UserIdentity {
        Self::from_map(&self.store.snapshot())
    }

    /// Identity stream, starting with the current value.
    pub fn watch(&self) -> impl Stream<Item = UserIdentity> + Send + use<> {
        self.store.read().map(|map| Self::from_map(&map))
    }

    /// Name that a submission made right now would carry.
    #[must_use]
    pub fn effective_display_name(&self) -> String {
        self.current().display_name()
    }

    pub async fn update_nickname(&self, nickname: &str) -> AppResult<()> {
        self.store
            .write(NICKNAME_KEY, Value::String(nickname.to_string()))
            .await
    }

    pub async fn update_anonymous(&self, anonymous: bool) -> AppResult<()> {
        self.store.write(ANONYMOUS_KEY, Value::Bool(anonymous)).await
    }

    /// Replace both fields in one write.
    pub async fn update(&self, identity: &UserIdentity) -> AppResult<()> {
        self.store
            .write_many(vec![
                (
                    NICKNAME_KEY.to_string(),
                    Value::String(identity.nickname.clone()),
                ),
                (ANONYMOUS_KEY.to_string(), Value::Bool(identity.anonymous)),
            ])
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::ANONYMOUS_NICKNAME;
    use reportline_db::repositories::PreferenceRepository;
    use reportline_db::test_utils::memory_db;

    async fn identity() -> IdentityPreferences {
        let db = Arc::new(memory_db().await.unwrap());
        let store = PreferenceStore::open(PreferenceRepository::new(db), IDENTITY_NAMESPACE)
            .await
            .unwrap();
        IdentityPreferences::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_defaults() {
        let prefs = identity().await;
        assert_eq!(prefs.current(), UserIdentity::default());
        assert_eq!(prefs.effective_display_name(), ANONYMOUS_NICKNAME);
    }

    #[tokio::test]
    async fn test_nickname_applies_only_when_not_anonymous() {
        let prefs = identity().await;

        prefs.update_nickname("ana").await.unwrap();
        assert_eq!(prefs.effective_display_name(), ANONYMOUS_NICKNAME);

        prefs.update_anonymous(false).await.unwrap();
        assert_eq!(prefs.effective_display_name(), "ana");

        prefs.update_nickname("").await.unwrap();
        assert_eq!(prefs.effective_display_name(), ANONYMOUS_NICKNAME);
    }

    #[tokio::test]
    async fn test_watch_sees_combined_update() {
        let prefs = identity().await;
        let mut stream = Box::pin(prefs.watch());
        assert_eq!(stream.next().await.unwrap(), UserIdentity::default());

        let named = UserIdentity {
            nickname: "bea".to_string(),
            anonymous: false,
        };
        prefs.update(&named).await.unwrap();

        assert_eq!(stream.next().await.unwrap(), named);
    }
}
