//! One controllable degree of freedom.
//!
//! A joint maps degrees to servo counts through a fixed affine transform
//! derived from two calibration points, `(min_deg, min)` and
//! `(max_deg, max)`.  The forward map saturates at the endpoint counts;
//! out-of-range angles are never an error.

use serde::{Deserialize, Serialize};

pub use crate::params::JointParams;
use crate::servo::control_table::ServoModel;

/// Affine degrees ↔ counts transform of one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMap {
    min_deg: f64,
    max_deg: f64,
    min_count: i32,
    max_count: i32,
}

impl JointMap {
    pub fn new(min_deg: f64, max_deg: f64, min_count: i32, max_count: i32) -> Self {
        Self {
            min_deg,
            max_deg,
            min_count,
            max_count,
        }
    }

    pub fn from_params(p: &JointParams) -> Self {
        Self::new(p.min_deg, p.max_deg, p.min, p.max)
    }

    /// Counts per degree.
    pub fn slope(&self) -> f64 {
        (f64::from(self.max_count) - f64::from(self.min_count)) / (self.max_deg - self.min_deg)
    }

    /// Lowest and highest count the forward map can produce.
    pub fn bounds(&self) -> (i32, i32) {
        (
            self.min_count.min(self.max_count),
            self.min_count.max(self.max_count),
        )
    }

    /// Saturate a count into [`bounds`](Self::bounds).
    pub fn clamp_count(&self, count: i32) -> i32 {
        let (lo, hi) = self.bounds();
        count.clamp(lo, hi)
    }

    /// Angle → count, saturating at the endpoint counts.
    ///
    /// The fractional part is truncated.  A NaN angle (or a NaN from a
    /// degenerate calibration) maps to `min_count`.
    pub fn count_for(&self, angle_deg: f64) -> i32 {
        let m = self.slope();
        let c = f64::from(self.max_count) - m * self.max_deg;
        let raw = m * angle_deg + c;
        if raw.is_nan() {
            return self.min_count;
        }
        let (lo, hi) = self.bounds();
        raw.clamp(f64::from(lo), f64::from(hi)) as i32
    }

    /// Count → angle.  Not clamped: a servo pushed past its calibrated
    /// endpoints reports an angle outside `min_deg..=max_deg`.
    pub fn angle_for(&self, count: i32) -> f64 {
        self.min_deg + (f64::from(count) - f64::from(self.min_count)) / self.slope()
    }
}

/// Last commanded (not confirmed) joint position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub angle_deg: f64,
    pub count: i32,
}

#[derive(Debug, Clone)]
pub struct Joint {
    name: String,
    /// Owning finger, by name.
    finger: String,
    id: u8,
    map: JointMap,
    reverse: bool,
    offset: i32,
    neutral: Option<i32>,
    model: Option<ServoModel>,
    state: JointState,
}

impl Joint {
    /// Build from persisted params.  The cached state starts at
    /// `(min_deg, min)`.
    pub fn from_params(finger: &str, name: &str, p: &JointParams) -> Self {
        Self {
            name: name.to_string(),
            finger: finger.to_string(),
            id: p.id,
            map: JointMap::from_params(p),
            reverse: p.reverse,
            offset: p.offset,
            neutral: p.neutral,
            model: p.model,
            state: JointState {
                angle_deg: p.min_deg,
                count: p.min,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn finger(&self) -> &str {
        &self.finger
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn map(&self) -> &JointMap {
        &self.map
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn model(&self) -> Option<ServoModel> {
        self.model
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    pub fn state(&self) -> JointState {
        self.state
    }

    /// Update the cached angle and its mapped count.  Returns the count.
    pub fn set_angle(&mut self, angle_deg: f64) -> i32 {
        let count = self.map.count_for(angle_deg);
        self.state = JointState { angle_deg, count };
        count
    }

    /// Assign cached state verbatim, saturating the count.
    pub fn set_state(&mut self, state: JointState) {
        self.state = JointState {
            angle_deg: state.angle_deg,
            count: self.map.clamp_count(state.count),
        };
    }

    /// Goal sent on the bus: cached count plus calibration offset.
    pub fn goal_count(&self) -> i32 {
        self.state.count.saturating_add(self.offset)
    }

    /// Map a present-position reading back to degrees, removing the offset.
    pub fn angle_from_present(&self, present: i32) -> f64 {
        self.map.angle_for(present.saturating_sub(self.offset))
    }

    /// Persisted form, carrying the current offset.
    pub fn params(&self) -> JointParams {
        JointParams {
            id: self.id,
            min: self.map.min_count,
            max: self.map.max_count,
            neutral: self.neutral,
            min_deg: self.map.min_deg,
            max_deg: self.map.max_deg,
            reverse: self.reverse,
            offset: self.offset,
            model: self.model,
        }
    }
}
