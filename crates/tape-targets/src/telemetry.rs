//! Serial telemetry records.
//!
//! One tagged, comma-separated line per successfully solved target,
//! fire-and-forget over whatever byte stream carries data to the robot
//! controller.

use std::io::{self, Write};

use crate::pipeline::TargetObservation;

pub struct TelemetryWriter<W: Write> {
    sink: W,
}

impl<W: Write> TelemetryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Emit the three legs of the translation triangle: straight-line
    /// distance, lateral offset, and depth.
    pub fn send(&mut self, observation: &TargetObservation) -> io::Result<()> {
        writeln!(
            self.sink,
            "RDIST {:.2},{:.2},{:.2}",
            observation.distance, observation.lateral, observation.depth
        )
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use tape_targets_pose::EulerAngles;

    #[test]
    fn records_are_tagged_comma_separated_lines() {
        let observation = TargetObservation {
            target_index: 0,
            distance: 61.237,
            lateral: -3.5,
            depth: 61.136,
            euler: EulerAngles {
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0,
            },
            center: Point2::new(320.0, 240.0),
        };

        let mut writer = TelemetryWriter::new(Vec::new());
        writer.send(&observation).unwrap();
        let line = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(line, "RDIST 61.24,-3.50,61.14\n");
    }
}
