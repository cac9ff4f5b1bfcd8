use std::fmt;
use std::str::FromStr;

/// Per-pixel statistic a projection computes across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectionMode {
    /// Darkest value seen at each pixel.
    Min,
    /// Brightest value seen at each pixel.
    Max,
    /// Exact running total in 64-bit.
    Sum,
    /// Mean over all frames, stretched to the full 8-bit range.
    Average,
}

impl ProjectionMode {
    pub const ALL: [ProjectionMode; 4] = [
        ProjectionMode::Min,
        ProjectionMode::Max,
        ProjectionMode::Sum,
        ProjectionMode::Average,
    ];

    /// Whether the running buffer is wider than the input samples.
    pub fn widens(self) -> bool {
        matches!(self, ProjectionMode::Sum | ProjectionMode::Average)
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectionMode::Min => "min",
            ProjectionMode::Max => "max",
            ProjectionMode::Sum => "sum",
            ProjectionMode::Average => "average",
        };
        f.write_str(name)
    }
}

impl FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" | "darkest" => Ok(ProjectionMode::Min),
            "max" | "brightest" => Ok(ProjectionMode::Max),
            "sum" => Ok(ProjectionMode::Sum),
            "average" | "avg" | "mean" => Ok(ProjectionMode::Average),
            other => Err(format!(
                "unknown projection mode '{other}' (expected min, max, sum or average)"
            )),
        }
    }
}
