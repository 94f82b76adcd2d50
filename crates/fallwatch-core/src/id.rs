//! Identity types for the monitoring pipeline
//!
//! Identifiers are sequence numbers scoped to a monitored subject. The subject
//! is chosen once per process, so an id is unique for the lifetime of the
//! process and readable in logs as `<subject>-<seq>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FallwatchError;

/// Monitored subject identity
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SubjectId(pub u64);

impl SubjectId {
    pub const ZERO: SubjectId = SubjectId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        SubjectId(id)
    }

    /// Random subject id, used when a process starts monitoring
    pub fn random() -> Self {
        SubjectId(rand::random())
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject({:016x})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

macro_rules! sequence_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name {
            pub subject: SubjectId,
            pub seq: u64,
        }

        impl $name {
            #[inline]
            pub fn new(subject: SubjectId, seq: u64) -> Self {
                $name { subject, seq }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:016x}:{})", $label, self.subject.0, self.seq)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016x}-{}", self.subject.0, self.seq)
            }
        }

        impl FromStr for $name {
            type Err = FallwatchError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (subject, seq) = s
                    .split_once('-')
                    .ok_or_else(|| FallwatchError::InvalidId(s.to_string()))?;
                let subject = u64::from_str_radix(subject, 16)
                    .map_err(|_| FallwatchError::InvalidId(s.to_string()))?;
                let seq = seq
                    .parse::<u64>()
                    .map_err(|_| FallwatchError::InvalidId(s.to_string()))?;
                Ok($name::new(SubjectId(subject), seq))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

sequence_id!(
    /// Event identity - unique per subject, referenced by event chains
    EventId,
    "Event"
);

sequence_id!(
    /// Snapshot identity - the correlation key for every artifact of one cycle
    SnapshotId,
    "Snapshot"
);

/// Issues event and snapshot ids from one monotonically increasing counter
#[derive(Clone, Debug)]
pub struct IdSequence {
    subject: SubjectId,
    next: u64,
}

impl IdSequence {
    pub fn new(subject: SubjectId) -> Self {
        IdSequence { subject, next: 1 }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next;
        self.next += 1;
        seq
    }

    pub fn next_event(&mut self) -> EventId {
        EventId::new(self.subject, self.bump())
    }

    pub fn next_snapshot(&mut self) -> SnapshotId {
        SnapshotId::new(self.subject, self.bump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_display_parse() {
        let id = EventId::new(SubjectId::new(0xDEADBEEF), 42);
        let text = id.to_string();
        assert_eq!(text, "00000000deadbeef-42");
        assert_eq!(text.parse::<EventId>().unwrap(), id);
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert!("not-an-id".parse::<SnapshotId>().is_err());
        assert!("0123".parse::<SnapshotId>().is_err());
    }

    #[test]
    fn test_sequence_never_repeats() {
        let mut ids = IdSequence::new(SubjectId::new(7));
        let a = ids.next_event();
        let b = ids.next_snapshot();
        let c = ids.next_event();
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        assert_eq!(c.seq, 3);
        assert_eq!(b.subject, SubjectId::new(7));
    }

    #[test]
    fn test_serde_as_string() {
        let id = SnapshotId::new(SubjectId::new(1), 9);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0000000000000001-9\"");
        let back: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
