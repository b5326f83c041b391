use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One of the two competitors shown on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::One, Player::Two];
}

/// Addressable element of the overlay. The view layer maps these onto its own
/// widgets or DOM nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Whole match panel.
    Match,
    /// Backdrop behind the match panel.
    Background,
    /// Score indicator `index` (1..=3) for a player.
    Point { player: Player, index: u8 },
    ScoreboardName(Player),
    InfoName(Player),
    Commentary(Player),
    Avatar(Player),
    Elo(Player),
    PersonalBest(Player),
    PbTime(Player),
    /// Command line `index` (1..=3) under the match panel.
    Command(u8),
    Timer,
}

/// Declarative, idempotent instruction for the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UpdateCommand {
    SetText { slot: Slot, text: String },
    SetVisibility { slot: Slot, visible: bool },
    /// Replace any existing `style-*` class on the root with `class`.
    SetStyleClass { class: String },
    SetImageSource { slot: Slot, src: String },
}

/// Consumer of reconciliation output. Implementations own the presentation
/// surface and must treat repeated commands as no-ops.
pub trait Renderer {
    fn apply(&mut self, commands: &[UpdateCommand]) -> Result<()>;
}

/// In-memory mirror of what the overlay currently shows.
#[derive(Debug, Default, Clone)]
pub struct ViewModel {
    texts: HashMap<Slot, String>,
    visibility: HashMap<Slot, bool>,
    images: HashMap<Slot, String>,
    style_class: Option<String>,
    last_updates: Vec<UpdateCommand>,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, slot: Slot) -> Option<&str> {
        self.texts.get(&slot).map(String::as_str)
    }

    /// Slots that were never touched count as visible.
    pub fn is_visible(&self, slot: Slot) -> bool {
        self.visibility.get(&slot).copied().unwrap_or(true)
    }

    pub fn image(&self, slot: Slot) -> Option<&str> {
        self.images.get(&slot).map(String::as_str)
    }

    pub fn style_class(&self) -> Option<&str> {
        self.style_class.as_deref()
    }

    pub fn last_updates(&self) -> &[UpdateCommand] {
        &self.last_updates
    }

    /// Number of score indicators currently shown for `player`.
    pub fn visible_points(&self, player: Player) -> usize {
        (1..=3)
            .filter(|&index| self.is_visible(Slot::Point { player, index }))
            .count()
    }
}

impl Renderer for ViewModel {
    fn apply(&mut self, commands: &[UpdateCommand]) -> Result<()> {
        for command in commands {
            match command {
                UpdateCommand::SetText { slot, text } => {
                    self.texts.insert(*slot, text.clone());
                }
                UpdateCommand::SetVisibility { slot, visible } => {
                    self.visibility.insert(*slot, *visible);
                }
                UpdateCommand::SetStyleClass { class } => {
                    self.style_class = Some(class.clone());
                }
                UpdateCommand::SetImageSource { slot, src } => {
                    self.images.insert(*slot, src.clone());
                }
            }
        }
        self.last_updates = commands.to_vec();
        Ok(())
    }
}
