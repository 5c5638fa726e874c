use super::{RequirementResolver, ResolveError};
use crate::distro::DistroProfile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory resolver answering from a fixed table
///
/// Unknown packages resolve to an empty requirement set. Every call is counted
/// so callers can assert how many lookups were made.
#[derive(Default)]
pub struct StaticResolver {
    responses: HashMap<String, Result<Vec<String>, ResolveError>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requirements(mut self, package: impl Into<String>, commands: &[&str]) -> Self {
        self.responses.insert(
            package.into(),
            Ok(commands.iter().map(|c| c.to_string()).collect()),
        );
        self
    }

    pub fn with_error(mut self, package: impl Into<String>, error: ResolveError) -> Self {
        self.responses.insert(package.into(), Err(error));
        self
    }

    /// Delays the answer for `package`, to simulate a slow service
    pub fn with_delay(mut self, package: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(package.into(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequirementResolver for StaticResolver {
    async fn resolve(
        &self,
        package: &str,
        _profile: &DistroProfile,
    ) -> Result<Vec<String>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(package) {
            tokio::time::sleep(*delay).await;
        }

        self.responses
            .get(package)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "static"
    }
}
