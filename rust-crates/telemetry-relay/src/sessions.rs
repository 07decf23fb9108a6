//! Session registry

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Rendered in place of settings that were never applied
pub const SETTINGS_SENTINEL: &str = "-";

/// A named measurement campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub start_date: String,
    pub last_date: String,
    /// Point count, kept as sent by the client
    pub points: String,
    /// Device settings bound at the last measurement start
    pub settings: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start_date: impl Into<String>,
        last_date: impl Into<String>,
        points: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_date: start_date.into(),
            last_date: last_date.into(),
            points: points.into(),
            settings: None,
        }
    }

    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = Some(settings.into());
        self
    }

    /// Settings as shown on the wire
    pub fn settings_or_sentinel(&self) -> &str {
        match self.settings.as_deref() {
            Some(settings) if !settings.trim().is_empty() => settings,
            _ => SETTINGS_SENTINEL,
        }
    }

    /// `[id, name, start, last, points, settings]`
    pub fn to_record(&self) -> String {
        format!(
            "[{}, {}, {}, {}, {}, {}]",
            self.id,
            self.name,
            self.start_date,
            self.last_date,
            self.points,
            self.settings_or_sentinel()
        )
    }

    /// Copy safe to embed in a bracketed, comma-separated record
    fn sanitized(&self) -> Self {
        Self {
            id: sanitize_field(&self.id),
            name: sanitize_field(&self.name),
            start_date: sanitize_field(&self.start_date),
            last_date: sanitize_field(&self.last_date),
            points: sanitize_field(&self.points),
            settings: self
                .settings
                .as_deref()
                .map(sanitize_field)
                .filter(|settings| !settings.is_empty()),
        }
    }
}

/// Strip line breaks and brackets that would break the record encoding
pub fn sanitize_field(field: &str) -> String {
    field
        .replace(['\n', '\r'], " ")
        .replace('[', "(")
        .replace(']', ")")
        .trim()
        .to_string()
}

/// Demo sessions available before any client adds its own
pub fn demo_sessions() -> Vec<Session> {
    vec![
        Session::new("Session1ID", "Сессия 1", "2025-09-01", "2025-09-10", "12"),
        Session::new("Session2ID", "Сессия 2", "2025-09-05", "2025-09-15", "8")
            .with_settings("SF=7, TX=14, BW=125"),
        Session::new("Session3ID", "Сессия 3", "2025-09-08", "2025-09-20", "20"),
        Session::new("Session4ID", "Сессия 4", "2025-09-08", "2025-09-20", "20"),
    ]
}

/// Thread-safe id → session map. Callers only ever see copies.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let map = sessions
            .into_iter()
            .map(|session| (session.id.clone(), session))
            .collect();
        Self {
            sessions: Arc::new(RwLock::new(map)),
        }
    }

    /// Sanitized copies, sorted by raw id
    pub async fn list(&self) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<&String> = sessions.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| sessions[id].sanitized()).collect()
    }

    /// Insert, replacing any session with the same id
    pub async fn add(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        if sessions.insert(session.id.clone(), session).is_some() {
            tracing::debug!("Session overwritten by add");
        }
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn apply_settings(&self, id: &str, settings: &str) {
        if settings.is_empty() {
            return;
        }
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.settings = Some(settings.to_string());
        }
    }

    pub async fn touch_last_date(&self, id: &str, timestamp: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.last_date = timestamp.to_string();
        }
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
