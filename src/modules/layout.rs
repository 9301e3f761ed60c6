use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::modules::world::Position;

const QUADRANT_REACH: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Quadrant {
    LowerRight,
    UpperLeft,
    LowerLeft,
    UpperRight,
}

impl Quadrant {
    pub const CANONICAL_ORDER: [Quadrant; 4] = [
        Quadrant::LowerRight,
        Quadrant::UpperLeft,
        Quadrant::LowerLeft,
        Quadrant::UpperRight,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Quadrant::LowerRight => "lowerRight",
            Quadrant::UpperLeft => "upperLeft",
            Quadrant::LowerLeft => "lowerLeft",
            Quadrant::UpperRight => "upperRight",
        }
    }

    /// Sign of x and y for coordinates inside this quadrant (y grows downward).
    const fn signs(self) -> (i32, i32) {
        match self {
            Quadrant::LowerRight => (1, 1),
            Quadrant::UpperLeft => (-1, -1),
            Quadrant::LowerLeft => (-1, 1),
            Quadrant::UpperRight => (1, -1),
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Quadrant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "lowerright" => Ok(Quadrant::LowerRight),
            "upperleft" => Ok(Quadrant::UpperLeft),
            "lowerleft" => Ok(Quadrant::LowerLeft),
            "upperright" => Ok(Quadrant::UpperRight),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub dx: i32,
    pub dy: i32,
}

impl Coord {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLayout {
    pub anchor: Position,
    pub quadrants: BTreeMap<Quadrant, Vec<Coord>>,
    #[serde(default)]
    pub standby: BTreeMap<Quadrant, Vec<Coord>>,
}

impl BaseLayout {
    pub fn new(anchor: Position) -> Self {
        Self {
            anchor,
            quadrants: BTreeMap::new(),
            standby: BTreeMap::new(),
        }
    }

    /// World position of a layout coordinate, or `None` when it falls outside
    /// the room.
    pub fn resolve(&self, coord: Coord) -> Option<Position> {
        let position = self.anchor.offset(coord.dx, coord.dy);
        position.in_bounds().then_some(position)
    }

    pub fn coords(&self, quadrant: Quadrant) -> &[Coord] {
        self.quadrants
            .get(&quadrant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn standby_coords(&self, quadrant: Quadrant) -> &[Coord] {
        self.standby
            .get(&quadrant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for BaseLayout {
    fn default() -> Self {
        let mut layout = BaseLayout::new(Position::new(25, 25));
        for quadrant in Quadrant::CANONICAL_ORDER {
            let (sx, sy) = quadrant.signs();
            layout.quadrants.insert(quadrant, fill_order(sx, sy));
            // Standby spots sit on the road cross between quadrants.
            layout
                .standby
                .insert(quadrant, vec![Coord::new(sx * 2, 0), Coord::new(0, sy * 2)]);
        }
        layout
    }
}

fn fill_order(sx: i32, sy: i32) -> Vec<Coord> {
    let mut offsets: Vec<(i32, i32)> = Vec::new();
    for dy in 1..=QUADRANT_REACH {
        for dx in 1..=QUADRANT_REACH {
            offsets.push((dx, dy));
        }
    }
    offsets.sort_by_key(|(dx, dy)| (*dx.max(dy), *dy, *dx));
    offsets
        .into_iter()
        .map(|(dx, dy)| Coord::new(sx * dx, sy * dy))
        .collect()
}

fn layout_dir() -> PathBuf {
    PathBuf::from(".hauler")
}

pub fn layout_file_path() -> PathBuf {
    layout_dir().join("layout.json")
}

pub fn load_layout() -> io::Result<BaseLayout> {
    let path = layout_file_path();
    if !path.exists() {
        return Ok(BaseLayout::default());
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(BaseLayout::default());
    }

    let layout: BaseLayout = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "failed to parse layout {}; delete it to reset: {}",
                path.display(),
                e
            ),
        )
    })?;

    Ok(layout)
}

pub fn save_layout(layout: &BaseLayout) -> io::Result<()> {
    fs::create_dir_all(layout_dir())?;
    let json = serde_json::to_vec_pretty(layout)?;
    fs::write(layout_file_path(), json)?;
    Ok(())
}
