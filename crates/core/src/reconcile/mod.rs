//! Reconciliation of the query string against committed overlay state.
//!
//! A pass reads every known parameter from a [`RawQuery`], commits the values
//! it owns (scores, IGNs), drives the [`MatchTimer`] and returns the ordered
//! [`UpdateCommand`]s the view layer needs. Parameters that are absent leave
//! both committed state and the view untouched, so successive URLs act as
//! partial updates.

use crate::{
    config::OverlayConfig,
    query::{parse_clock, parse_points, parse_visible, RawQuery, TimerAction, MAX_POINTS},
    render::{Player, Slot, UpdateCommand},
    timer::MatchTimer,
};

/// Committed score counters, always within `[0, MAX_POINTS]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreState {
    points: [u8; 2],
}

impl ScoreState {
    pub fn get(&self, player: Player) -> u8 {
        self.points[index(player)]
    }

    pub fn set(&mut self, player: Player, points: u8) {
        self.points[index(player)] = points.min(MAX_POINTS);
    }
}

/// Last committed in-game names, used to build avatar URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    igns: [Option<String>; 2],
}

impl PlayerState {
    pub fn ign(&self, player: Player) -> Option<&str> {
        self.igns[index(player)].as_deref()
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    config: OverlayConfig,
    scores: ScoreState,
    players: PlayerState,
}

impl Reconciler {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            scores: ScoreState::default(),
            players: PlayerState::default(),
        }
    }

    pub fn scores(&self) -> ScoreState {
        self.scores
    }

    pub fn players(&self) -> &PlayerState {
        &self.players
    }

    /// Runs one reconciliation pass.
    pub fn apply(&mut self, query: &RawQuery, timer: &mut MatchTimer) -> Vec<UpdateCommand> {
        let mut commands = Vec::new();

        if let Some(style) = query.get("style").filter(|style| !style.is_empty()) {
            commands.push(UpdateCommand::SetStyleClass {
                class: format!("style-{style}"),
            });
        }

        let preset_visible = query
            .get("state")
            .and_then(|state| self.config.presets.resolve(state));

        self.apply_scores(query, &mut commands);
        self.apply_player_fields(query, &mut commands);
        apply_timer(query, timer, &mut commands);

        for (slot, key) in [
            (Slot::Command(1), "cmd1"),
            (Slot::Command(2), "cmd2"),
            (Slot::Command(3), "cmd3"),
        ] {
            push_text(query, key, &[slot], &mut commands);
        }

        let visible = resolve_visibility(query.get("visible"), preset_visible);
        for slot in [Slot::Match, Slot::Background] {
            commands.push(UpdateCommand::SetVisibility { slot, visible });
        }

        tracing::debug!(
            params = query.len(),
            commands = commands.len(),
            visible,
            "reconciled overlay state"
        );
        commands
    }

    fn apply_scores(&mut self, query: &RawQuery, commands: &mut Vec<UpdateCommand>) {
        for (player, key) in [(Player::One, "points1"), (Player::Two, "points2")] {
            if let Some(value) = query.get(key) {
                self.scores.set(player, parse_points(value));
            }
        }

        // Derived from committed state on every pass, changed or not.
        for player in Player::BOTH {
            let points = self.scores.get(player);
            for index in 1..=MAX_POINTS {
                commands.push(UpdateCommand::SetVisibility {
                    slot: Slot::Point { player, index },
                    visible: points >= index,
                });
            }
        }
    }

    fn apply_player_fields(&mut self, query: &RawQuery, commands: &mut Vec<UpdateCommand>) {
        for player in Player::BOTH {
            let n = index(player) + 1;

            push_text(
                query,
                &format!("player{n}"),
                &[Slot::ScoreboardName(player), Slot::InfoName(player)],
                commands,
            );
            push_text(
                query,
                &format!("commentary{n}"),
                &[Slot::Commentary(player)],
                commands,
            );

            if let Some(ign) = query.get(&format!("player{n}ign")) {
                self.players.igns[index(player)] = Some(ign.to_string());
                commands.push(UpdateCommand::SetImageSource {
                    slot: Slot::Avatar(player),
                    src: self.config.avatar_url(ign),
                });
            }

            push_text(query, &format!("player{n}elo"), &[Slot::Elo(player)], commands);
            push_text(
                query,
                &format!("player{n}pb"),
                &[Slot::PersonalBest(player)],
                commands,
            );
            push_text(query, &format!("pb{n}"), &[Slot::PbTime(player)], commands);
        }
    }
}

/// Explicit `visible` beats the preset, which beats the default of shown.
pub fn resolve_visibility(explicit: Option<&str>, preset: Option<bool>) -> bool {
    match explicit {
        Some(value) => parse_visible(value),
        None => preset.unwrap_or(true),
    }
}

/// `time` is applied before `timer` so `time=05:00&timer=start` resumes from
/// five minutes.
fn apply_timer(query: &RawQuery, timer: &mut MatchTimer, commands: &mut Vec<UpdateCommand>) {
    if let Some(time) = query.get("time") {
        timer.set_absolute(parse_clock(time));
        commands.push(timer.render());
    }

    match query.get("timer").and_then(TimerAction::parse) {
        Some(TimerAction::Start) => timer.start(),
        Some(TimerAction::Reset) => {
            timer.reset();
            commands.push(timer.render());
        }
        None => {}
    }
}

fn push_text(query: &RawQuery, key: &str, slots: &[Slot], commands: &mut Vec<UpdateCommand>) {
    if let Some(text) = query.get(key) {
        commands.extend(slots.iter().map(|&slot| UpdateCommand::SetText {
            slot,
            text: text.to_string(),
        }));
    }
}

fn index(player: Player) -> usize {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Renderer, ViewModel};

    struct Harness {
        reconciler: Reconciler,
        timer: MatchTimer,
        view: ViewModel,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                reconciler: Reconciler::new(OverlayConfig::default()),
                timer: MatchTimer::new(),
                view: ViewModel::new(),
            }
        }

        fn apply(&mut self, query: &str) -> Vec<UpdateCommand> {
            let commands = self
                .reconciler
                .apply(&RawQuery::parse(query), &mut self.timer);
            self.view.apply(&commands).unwrap();
            commands
        }
    }

    #[test]
    fn score_indicators_match_points() {
        for s1 in 0..=3u8 {
            for s2 in 0..=3u8 {
                let mut harness = Harness::new();
                harness.apply(&format!("points1={s1}&points2={s2}"));
                assert_eq!(harness.view.visible_points(Player::One), s1 as usize);
                assert_eq!(harness.view.visible_points(Player::Two), s2 as usize);
            }
        }
    }

    #[test]
    fn out_of_range_scores_clamp() {
        let mut harness = Harness::new();
        harness.apply("points1=9&points2=-2");
        assert_eq!(harness.reconciler.scores().get(Player::One), 3);
        assert_eq!(harness.reconciler.scores().get(Player::Two), 0);
        assert_eq!(harness.view.visible_points(Player::One), 3);
        assert_eq!(harness.view.visible_points(Player::Two), 0);
    }

    #[test]
    fn point_indicators_are_always_emitted() {
        let mut harness = Harness::new();
        let commands = harness.apply("player1=Alice");
        let points = commands
            .iter()
            .filter(|c| matches!(c, UpdateCommand::SetVisibility { slot: Slot::Point { .. }, .. }))
            .count();
        assert_eq!(points, 6);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let query = "style=dark&state=2&points1=2&points2=1&player1=A&player2ign=Notch&time=01:30&timer=0";
        let mut harness = Harness::new();
        let first = harness.apply(query);
        let scores = harness.reconciler.scores();
        let elapsed = harness.timer.elapsed();

        let second = harness.apply(query);
        assert_eq!(first, second);
        assert_eq!(harness.reconciler.scores(), scores);
        assert_eq!(harness.timer.elapsed(), elapsed);
        assert!(!harness.timer.is_running());
    }

    #[test]
    fn visibility_precedence() {
        let mut harness = Harness::new();
        harness.apply("state=4&visible=true");
        assert!(harness.view.is_visible(Slot::Match));
        assert!(harness.view.is_visible(Slot::Background));

        harness.apply("state=4");
        assert!(!harness.view.is_visible(Slot::Match));
        assert!(!harness.view.is_visible(Slot::Background));

        harness.apply("");
        assert!(harness.view.is_visible(Slot::Match));

        harness.apply("state=1&visible=hidden");
        assert!(!harness.view.is_visible(Slot::Match));

        harness.apply("state=99");
        assert!(harness.view.is_visible(Slot::Match));
    }

    #[test]
    fn resolve_visibility_table() {
        assert!(resolve_visibility(Some("true"), Some(false)));
        assert!(!resolve_visibility(Some("0"), Some(true)));
        assert!(!resolve_visibility(None, Some(false)));
        assert!(resolve_visibility(None, None));
    }

    #[test]
    fn absent_fields_leave_prior_values() {
        let mut harness = Harness::new();
        harness.apply("player1=Alice&player1ign=alice_mc");
        let commands = harness.apply("points1=2");

        assert!(!commands
            .iter()
            .any(|c| matches!(c, UpdateCommand::SetText { .. })));
        assert_eq!(harness.view.text(Slot::InfoName(Player::One)), Some("Alice"));
        assert_eq!(harness.view.text(Slot::ScoreboardName(Player::One)), Some("Alice"));
        assert_eq!(harness.reconciler.players().ign(Player::One), Some("alice_mc"));
        assert_eq!(harness.view.visible_points(Player::One), 2);
    }

    #[test]
    fn scores_persist_when_absent() {
        let mut harness = Harness::new();
        harness.apply("points2=3");
        harness.apply("points1=1");
        assert_eq!(harness.reconciler.scores().get(Player::Two), 3);
        assert_eq!(harness.view.visible_points(Player::Two), 3);
    }

    #[test]
    fn free_text_fields_pass_through() {
        let mut harness = Harness::new();
        harness.apply(
            "player2=%3Cb%3EBob%3C%2Fb%3E&commentary1=Caster&commentary2=Co&player1elo=1500&player2elo=1420\
             &player1pb=9:59&player2pb=10:01&pb1=12:00&pb2=13:00&cmd1=a&cmd2=b&cmd3=c",
        );

        let view = &harness.view;
        assert_eq!(view.text(Slot::ScoreboardName(Player::Two)), Some("<b>Bob</b>"));
        assert_eq!(view.text(Slot::Commentary(Player::One)), Some("Caster"));
        assert_eq!(view.text(Slot::Commentary(Player::Two)), Some("Co"));
        assert_eq!(view.text(Slot::Elo(Player::One)), Some("1500"));
        assert_eq!(view.text(Slot::Elo(Player::Two)), Some("1420"));
        assert_eq!(view.text(Slot::PersonalBest(Player::One)), Some("9:59"));
        assert_eq!(view.text(Slot::PersonalBest(Player::Two)), Some("10:01"));
        assert_eq!(view.text(Slot::PbTime(Player::One)), Some("12:00"));
        assert_eq!(view.text(Slot::PbTime(Player::Two)), Some("13:00"));
        assert_eq!(view.text(Slot::Command(1)), Some("a"));
        assert_eq!(view.text(Slot::Command(3)), Some("c"));
    }

    #[test]
    fn ign_builds_avatar_url() {
        let mut harness = Harness::new();
        harness.apply("player2ign=Notch");
        assert_eq!(
            harness.view.image(Slot::Avatar(Player::Two)),
            Some("http://cravatar.eu/avatar/Notch")
        );
        assert_eq!(harness.view.image(Slot::Avatar(Player::One)), None);
    }

    #[test]
    fn style_class_replaces_previous() {
        let mut harness = Harness::new();
        harness.apply("style=minimal");
        harness.apply("points1=1");
        assert_eq!(harness.view.style_class(), Some("style-minimal"));
        harness.apply("style=dark");
        assert_eq!(harness.view.style_class(), Some("style-dark"));
    }

    #[test]
    fn time_then_timer_ordering() {
        let mut harness = Harness::new();
        harness.apply("time=02:05");
        assert_eq!(harness.timer.elapsed(), 125);
        assert_eq!(harness.view.text(Slot::Timer), Some("02:05"));

        harness.apply("time=05:00&timer=start");
        assert_eq!(harness.timer.elapsed(), 300);
        assert!(harness.timer.is_running());

        harness.apply("time=bad");
        assert_eq!(harness.timer.elapsed(), 0);
        assert!(harness.timer.is_running());

        harness.apply("time=03:00&timer=reset");
        assert_eq!(harness.timer.elapsed(), 0);
        assert!(!harness.timer.is_running());
        assert_eq!(harness.view.text(Slot::Timer), Some("00:00"));
    }

    #[test]
    fn unknown_timer_value_is_ignored() {
        let mut harness = Harness::new();
        harness.apply("timer=start");
        harness.apply("timer=pause");
        assert!(harness.timer.is_running());
    }
}
