use pulsewatch_ids::Id;

/// Coordinator identifier. A type alias makes call sites read as "peer id"
/// rather than a bare entity [`Id`], while keeping the same ordering used for
/// leader election.
pub type PeerId = Id;
