// engine_core/src/tiles/autotile.rs
use crate::assets::asset_manager::AssetId;
use crate::rendering::renderer::Rect;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::Path;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// The 8 neighbours of a cell. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    /// Grid offset of the neighbour.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (1, -1),
            Direction::DownLeft => (-1, 1),
            Direction::DownRight => (1, 1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::UpLeft | Direction::UpRight | Direction::DownLeft | Direction::DownRight
        )
    }

    fn slot(self) -> usize {
        self as usize
    }

    /// Up, Down, Left, Right.
    pub fn orthogonal() -> impl Iterator<Item = Direction> {
        Direction::iter().filter(|d| !d.is_diagonal())
    }
}

/// Tri-state test on one neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Constraint {
    #[default]
    Any,
    MustMatch,
    MustNotMatch,
}

impl Constraint {
    pub fn allows(self, same_family: bool) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::MustMatch => same_family,
            Constraint::MustNotMatch => !same_family,
        }
    }
}

/// One constraint per direction plus the frame applied when all hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutotileRule {
    pub up: Constraint,
    pub down: Constraint,
    pub left: Constraint,
    pub right: Constraint,
    pub up_left: Constraint,
    pub up_right: Constraint,
    pub down_left: Constraint,
    pub down_right: Constraint,
    pub frame: u32,
}

impl AutotileRule {
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            ..Default::default()
        }
    }

    /// Builder style setter.
    pub fn with(mut self, direction: Direction, constraint: Constraint) -> Self {
        *self.constraint_mut(direction) = constraint;
        self
    }

    pub fn constraint(&self, direction: Direction) -> Constraint {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::UpLeft => self.up_left,
            Direction::UpRight => self.up_right,
            Direction::DownLeft => self.down_left,
            Direction::DownRight => self.down_right,
        }
    }

    fn constraint_mut(&mut self, direction: Direction) -> &mut Constraint {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::UpLeft => &mut self.up_left,
            Direction::UpRight => &mut self.up_right,
            Direction::DownLeft => &mut self.down_left,
            Direction::DownRight => &mut self.down_right,
        }
    }

    /// Number of constraints that are not `Any`.
    pub fn specificity(&self) -> usize {
        Direction::iter()
            .filter(|d| self.constraint(*d) != Constraint::Any)
            .count()
    }

    /// A rule without constraints is disabled and never matches.
    pub fn matches<F: Fn(Direction) -> bool>(&self, flags: &mut NeighbourFlags<F>) -> bool {
        if self.specificity() == 0 {
            return false;
        }
        Direction::iter().all(|d| {
            let constraint = self.constraint(d);
            constraint == Constraint::Any || constraint.allows(flags.get(d))
        })
    }
}

/// "Is the neighbour in this direction the same family" flags of one cell.
///
/// Orthogonal flags are computed up front, diagonal ones on first use.
pub struct NeighbourFlags<F: Fn(Direction) -> bool> {
    lookup: F,
    flags: [Option<bool>; 8],
}

impl<F: Fn(Direction) -> bool> NeighbourFlags<F> {
    pub fn new(lookup: F) -> Self {
        let mut flags = [None; 8];
        for direction in Direction::orthogonal() {
            flags[direction.slot()] = Some(lookup(direction));
        }
        Self { lookup, flags }
    }

    pub fn get(&mut self, direction: Direction) -> bool {
        let lookup = &self.lookup;
        *self.flags[direction.slot()].get_or_insert_with(|| lookup(direction))
    }
}

/// Rules for one tile index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutotileRuleSet {
    /// Index of the tiles this set applies to.
    pub tile_index: u32,
    /// Other indices that count as the same family for neighbour tests.
    pub family: Vec<u32>,
    /// Frame used when no rule matches.
    pub default_frame: u32,
    pub rules: Vec<AutotileRule>,
}

impl AutotileRuleSet {
    pub fn new(tile_index: u32, default_frame: u32) -> Self {
        Self {
            tile_index,
            default_frame,
            ..Default::default()
        }
    }

    pub fn with_rule(mut self, rule: AutotileRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// True if a neighbour holding `index` is the same family.
    pub fn is_family(&self, index: u32) -> bool {
        index == self.tile_index || self.family.contains(&index)
    }

    /// Picks the frame for a cell.
    ///
    /// Rules are tried from the most to the least specific; equally
    /// specific rules keep their list order.
    pub fn select_frame<F: Fn(Direction) -> bool>(&self, flags: &mut NeighbourFlags<F>) -> u32 {
        let mut ranked: Vec<&AutotileRule> = self.rules.iter().collect();
        ranked.sort_by_key(|rule| std::cmp::Reverse(rule.specificity()));

        ranked
            .into_iter()
            .find(|rule| rule.matches(flags))
            .map(|rule| rule.frame)
            .unwrap_or(self.default_frame)
    }
}

/// How frames are laid out in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    pub texture: AssetId,
    pub columns: u32,
    pub cell_size: u32,
}

impl AtlasLayout {
    /// Layout for a texture of the given pixel size. `None` if the texture
    /// is narrower than one cell.
    pub fn from_texture_size(texture: AssetId, size: (u32, u32), cell_size: u32) -> Option<Self> {
        if cell_size == 0 {
            return None;
        }
        let columns = size.0 / cell_size;
        (columns > 0).then_some(Self {
            texture,
            columns,
            cell_size,
        })
    }

    pub fn rect(&self, frame: u32) -> Rect {
        atlas_rect(frame, self.columns, self.cell_size)
    }
}

/// Source rectangle of `frame` in an atlas with `columns` cells per row.
pub fn atlas_rect(frame: u32, columns: u32, cell_size: u32) -> Rect {
    let columns = columns.max(1);
    let size = cell_size as f32;
    Rect::new(
        (frame % columns) as f32 * size,
        (frame / columns) as f32 * size,
        size,
        size,
    )
}

/// Reads rule sets from a RON file.
pub fn load_rule_presets(path: &Path) -> Result<Vec<AutotileRuleSet>, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let sets = ron::from_str(&text)?;
    Ok(sets)
}

/// Writes rule sets to a RON file.
pub fn save_rule_presets(path: &Path, sets: &[AutotileRuleSet]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = ron::ser::to_string_pretty(&sets, PrettyConfig::new())?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn flags_from(matching: &'static [Direction]) -> NeighbourFlags<impl Fn(Direction) -> bool> {
        NeighbourFlags::new(move |d| matching.contains(&d))
    }

    #[test]
    fn test_more_specific_rule_wins() {
        let loose = AutotileRule::new(1).with(Direction::Up, Constraint::MustMatch);
        let strict = AutotileRule::new(2)
            .with(Direction::Up, Constraint::MustMatch)
            .with(Direction::Left, Constraint::MustMatch)
            .with(Direction::Right, Constraint::MustNotMatch);
        let set = AutotileRuleSet::new(1, 0).with_rule(loose).with_rule(strict);

        let mut flags = flags_from(&[Direction::Up, Direction::Left]);
        assert_eq!(set.select_frame(&mut flags), 2);
    }

    #[test]
    fn test_equal_specificity_keeps_list_order() {
        let first = AutotileRule::new(7).with(Direction::Up, Constraint::MustMatch);
        let second = AutotileRule::new(8).with(Direction::Down, Constraint::MustMatch);
        let set = AutotileRuleSet::new(1, 0).with_rule(first).with_rule(second);

        let mut flags = flags_from(&[Direction::Up, Direction::Down]);
        assert_eq!(set.select_frame(&mut flags), 7);
    }

    #[test]
    fn test_rule_without_constraints_never_matches() {
        let set = AutotileRuleSet::new(1, 9).with_rule(AutotileRule::new(3));

        let mut flags = flags_from(&[]);
        assert_eq!(set.select_frame(&mut flags), 9);
    }

    #[test]
    fn test_diagonals_are_only_looked_up_when_tested() {
        let calls = Cell::new(0);
        let set = AutotileRuleSet::new(1, 0)
            .with_rule(AutotileRule::new(1).with(Direction::Left, Constraint::MustMatch));

        let mut flags = NeighbourFlags::new(|_| {
            calls.set(calls.get() + 1);
            true
        });
        set.select_frame(&mut flags);
        assert_eq!(calls.get(), 4);

        let corner = AutotileRuleSet::new(1, 0)
            .with_rule(AutotileRule::new(1).with(Direction::UpLeft, Constraint::MustNotMatch));
        corner.select_frame(&mut flags);
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_atlas_rect() {
        assert_eq!(atlas_rect(0, 4, 16), Rect::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(atlas_rect(5, 4, 16), Rect::new(16.0, 16.0, 16.0, 16.0));

        let layout = AtlasLayout::from_texture_size(AssetId(1), (64, 32), 16).unwrap();
        assert_eq!(layout.columns, 4);
        assert!(AtlasLayout::from_texture_size(AssetId(1), (8, 8), 16).is_none());
    }

    #[test]
    fn test_rule_presets_round_trip_through_ron() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets/grass.ron");
        let sets = vec![AutotileRuleSet {
            tile_index: 1,
            family: vec![2],
            default_frame: 4,
            rules: vec![AutotileRule::new(1).with(Direction::Up, Constraint::MustNotMatch)],
        }];

        save_rule_presets(&path, &sets).unwrap();
        let loaded = load_rule_presets(&path).unwrap();

        assert_eq!(loaded, sets);
    }
}
