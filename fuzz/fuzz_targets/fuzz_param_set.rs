//! Fuzz target: `HandParams::from_json` + `validate`
//!
//! Feeds arbitrary bytes to the parameter-set parser.  Whatever parses and
//! validates must build joints whose mapped counts stay inside their
//! calibrated endpoints, and must survive a save/reload round trip.
//!
//! cargo fuzz run fuzz_param_set

#![no_main]

use dexhand::kinematics::finger::Finger;
use dexhand::params::HandParams;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(params) = HandParams::from_json(text) else {
        return;
    };
    if params.validate().is_err() {
        return;
    }

    for (name, joints) in params.fingers() {
        let finger = Finger::from_params(name, joints);
        for joint in finger.joints() {
            let (lo, hi) = joint.map().bounds();
            for angle in [f64::MIN, -1.0e9, 0.0, 1.0e9, f64::MAX, f64::NAN] {
                let count = joint.map().count_for(angle);
                assert!((lo..=hi).contains(&count), "count {count} outside {lo}..={hi}");
            }
        }
    }

    let text = params.to_json_pretty().expect("serialize validated set");
    let back = HandParams::from_json(&text).expect("reparse own output");
    assert_eq!(back.joint_count(), params.joint_count());
});
