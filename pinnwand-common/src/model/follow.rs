use serde::{Deserialize, Serialize};

/// Follower/following counts of a user, as shown on profile and post pages.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize,
)]
pub struct FollowStats {
    pub followers: u64,
    pub following: u64,
}
