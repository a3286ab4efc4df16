//! Kinematic mapping layer: degrees ↔ servo counts, per joint, finger and
//! hand.

pub mod finger;
pub mod hand;
pub mod joint;
