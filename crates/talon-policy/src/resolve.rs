//! Role resolution.
//!
//! Maps `(peer id, channel)` to a role name under first-match semantics:
//! roles are tried in document order and the first whose `users` and
//! `channels` selectors both match wins. When nothing matches, the
//! policy's default role applies.

use crate::policy::Policy;

impl Policy {
    /// Resolve the role for a sender.
    ///
    /// Returns the name of the first declared role whose user and channel
    /// selectors both match, or [`Policy::default_role`] when none does.
    /// The returned name is always a key of the policy's role table.
    #[must_use]
    pub fn resolve_role(&self, peer_id: &str, channel: Option<&str>) -> &str {
        self.roles
            .iter()
            .find(|(_, spec)| spec.users.matches(peer_id) && spec.channels.matches(channel))
            .map_or(self.default_role.as_str(), |(name, _)| name.as_str())
    }
}
