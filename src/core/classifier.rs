use serde::Serialize;

/// Eight ordered population classes, `B1` lightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ColorBucket {
    B1,
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
}

// Lower bounds, exclusive, highest first.
const THRESHOLDS: [(f64, ColorBucket); 7] = [
    (500.0, ColorBucket::B8),
    (200.0, ColorBucket::B7),
    (100.0, ColorBucket::B6),
    (50.0, ColorBucket::B5),
    (20.0, ColorBucket::B4),
    (10.0, ColorBucket::B3),
    (0.0, ColorBucket::B2),
];

impl ColorBucket {
    pub const ALL: [ColorBucket; 8] = [
        ColorBucket::B1,
        ColorBucket::B2,
        ColorBucket::B3,
        ColorBucket::B4,
        ColorBucket::B5,
        ColorBucket::B6,
        ColorBucket::B7,
        ColorBucket::B8,
    ];

    /// 1 for the lightest bucket, 8 for the darkest.
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    pub fn color(self) -> &'static str {
        match self {
            ColorBucket::B1 => "#FFEDA0",
            ColorBucket::B2 => "#FED976",
            ColorBucket::B3 => "#FEB24C",
            ColorBucket::B4 => "#FD8D3C",
            ColorBucket::B5 => "#FC4E2A",
            ColorBucket::B6 => "#E31A1C",
            ColorBucket::B7 => "#BD0026",
            ColorBucket::B8 => "#800026",
        }
    }
}

/// Maps a population to its bucket. Negative and NaN inputs count as zero.
pub fn classify(population: f64) -> ColorBucket {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| population > *bound)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(ColorBucket::B1)
}
