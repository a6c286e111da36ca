//! Session-key parsing.
//!
//! A session key is an opaque colon-delimited routing string supplied by
//! the host, always starting with `agent:<agentId>`. The known shapes:
//!
//! ```text
//! agent:<a>:<peerKind>:<peerId>                      (per-peer)
//! agent:<a>:<channel>:<peerKind>:<peerId>            (per-channel-peer)
//! agent:<a>:<channel>:<account>:<peerKind>:<peerId>  (per-account-channel-peer)
//! agent:<a>:<channel>:group:<peerId>                 (group)
//! agent:<a>:<channel>:channel:<peerId>               (channel)
//! agent:<a>:main                                     (main — not a peer)
//! ```
//!
//! The parser is pure and performs no normalization on the peer id.

use std::fmt;

/// The kind of remote peer a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    /// A direct (one-to-one) conversation.
    Direct,
    /// A group conversation.
    Group,
    /// A broadcast channel.
    Channel,
}

impl PeerKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "direct" => Some(Self::Direct),
            "group" => Some(Self::Group),
            "channel" => Some(Self::Channel),
            _ => None,
        }
    }
}

impl fmt::Display for PeerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Group => write!(f, "group"),
            Self::Channel => write!(f, "channel"),
        }
    }
}

/// Sender identity and channel recovered from a session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSessionKey {
    /// Opaque sender identifier (never empty).
    pub peer_id: String,
    /// Transport or platform name; absent for non-channelized scopes.
    pub channel: Option<String>,
    /// Kind of peer the session addresses.
    pub peer_kind: PeerKind,
}

impl ParsedSessionKey {
    /// Parse a session key, returning `None` for any shape that does not
    /// address a peer (e.g. `agent:main`) or is otherwise malformed.
    ///
    /// The algorithm scans segments from index 2 for the first peer-kind
    /// marker (`direct`, `group`, `channel`); the following segment is the
    /// peer id. A marker at index 3 or later means index 2 carries the
    /// channel name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        // At least four segments.
        raw.split(':').nth(3)?;

        let (kind_index, peer_kind) =
            raw.split(':')
                .enumerate()
                .skip(2)
                .find_map(|(index, segment)| {
                    PeerKind::from_segment(segment).map(|kind| (index, kind))
                })?;

        let peer_id = raw.split(':').nth(kind_index.checked_add(1)?)?;
        if peer_id.is_empty() {
            return None;
        }

        let channel = if kind_index >= 3 {
            raw.split(':').nth(2).map(str::to_string)
        } else {
            None
        };

        Some(Self {
            peer_id: peer_id.to_string(),
            channel,
            peer_kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_peer_shape() {
        let parsed = ParsedSessionKey::parse("agent:main:direct:408001372").unwrap();
        assert_eq!(parsed.peer_id, "408001372");
        assert_eq!(parsed.channel, None);
        assert_eq!(parsed.peer_kind, PeerKind::Direct);
    }

    #[test]
    fn per_channel_peer_shape() {
        let parsed = ParsedSessionKey::parse("agent:main:telegram:direct:408001372").unwrap();
        assert_eq!(parsed.peer_id, "408001372");
        assert_eq!(parsed.channel.as_deref(), Some("telegram"));
        assert_eq!(parsed.peer_kind, PeerKind::Direct);
    }

    #[test]
    fn per_account_channel_peer_shape() {
        let parsed =
            ParsedSessionKey::parse("agent:main:telegram:bot1:direct:408001372").unwrap();
        assert_eq!(parsed.peer_id, "408001372");
        assert_eq!(parsed.channel.as_deref(), Some("telegram"));
        assert_eq!(parsed.peer_kind, PeerKind::Direct);
    }

    #[test]
    fn group_shape() {
        let parsed = ParsedSessionKey::parse("agent:main:telegram:group:-100123").unwrap();
        assert_eq!(parsed.peer_id, "-100123");
        assert_eq!(parsed.channel.as_deref(), Some("telegram"));
        assert_eq!(parsed.peer_kind, PeerKind::Group);
    }

    #[test]
    fn channel_shape() {
        let parsed = ParsedSessionKey::parse("agent:main:max:channel:newsfeed").unwrap();
        assert_eq!(parsed.peer_id, "newsfeed");
        assert_eq!(parsed.channel.as_deref(), Some("max"));
        assert_eq!(parsed.peer_kind, PeerKind::Channel);
    }

    #[test]
    fn main_session_is_not_a_peer() {
        assert!(ParsedSessionKey::parse("agent:main").is_none());
    }

    #[test]
    fn short_keys_are_unparseable() {
        assert!(ParsedSessionKey::parse("").is_none());
        assert!(ParsedSessionKey::parse("agent").is_none());
        assert!(ParsedSessionKey::parse("agent:main:direct").is_none());
    }

    #[test]
    fn missing_peer_kind_is_unparseable() {
        assert!(ParsedSessionKey::parse("agent:main:telegram:whatever").is_none());
    }

    #[test]
    fn empty_peer_id_is_unparseable() {
        assert!(ParsedSessionKey::parse("agent:main:telegram:direct:").is_none());
    }

    #[test]
    fn trailing_kind_without_peer_is_unparseable() {
        assert!(ParsedSessionKey::parse("agent:main:telegram:direct").is_none());
    }

    #[test]
    fn peer_id_is_taken_verbatim() {
        let parsed = ParsedSessionKey::parse("agent:main:telegram:direct:User@Mixed").unwrap();
        assert_eq!(parsed.peer_id, "User@Mixed");
    }

    #[test]
    fn round_trip_final_segment_is_peer_id() {
        for key in [
            "agent:a:direct:42",
            "agent:a:telegram:direct:42",
            "agent:a:telegram:acct:direct:42",
            "agent:a:telegram:group:42",
            "agent:a:telegram:channel:42",
        ] {
            let parsed = ParsedSessionKey::parse(key).unwrap();
            assert_eq!(Some(parsed.peer_id.as_str()), key.split(':').next_back());
        }
    }
}
