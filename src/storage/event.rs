/// Raw storage change notification as delivered by the platform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageEvent {
    /// Fully-qualified key that changed; `None` when the whole area was cleared.
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// URL of the document whose mutation caused the event.
    pub url: Option<String>,
}

impl StorageEvent {
    pub fn changed<K: Into<String>>(key: K, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value,
            url: None,
        }
    }

    pub fn with_url<U: Into<String>>(mut self, url: U) -> Self {
        self.url = Some(url.into());
        self
    }
}
