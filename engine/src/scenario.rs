// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{collections::HashSet, fmt, str::FromStr};

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Item, Store, User};

/// The flat diversity signal of every scenario candidate.
///
/// It is the same for all candidates and only shifts the scores by the scenario's diversity
/// weight, the ranking doesn't depend on it.
pub const DIVERSITY_SCORE: f32 = 0.1;

const STYLE_WEIGHT: f32 = 0.3;
const MOOD_WEIGHT: f32 = 0.2;
const COLOR_WEIGHT: f32 = 0.05;
const CATEGORY_WEIGHT: f32 = 0.15;
const TAG_WEIGHT: f32 = 0.05;

/// A usage context with its own preferred item attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Work,
    Gaming,
    Reading,
    Sleep,
    Creative,
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Unknown scenario: {0}
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub struct UnknownScenario(pub String);

impl Scenario {
    pub const ALL: [Self; 9] = [
        Self::Work,
        Self::Gaming,
        Self::Reading,
        Self::Sleep,
        Self::Creative,
        Self::Morning,
        Self::Afternoon,
        Self::Evening,
        Self::Night,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Gaming => "gaming",
            Self::Reading => "reading",
            Self::Sleep => "sleep",
            Self::Creative => "creative",
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    /// Maps the hour of the day to its time of day scenario.
    pub fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn config(self) -> &'static ScenarioConfig {
        match self {
            Self::Work => &WORK,
            Self::Gaming => &GAMING,
            Self::Reading => &READING,
            Self::Sleep => &SLEEP,
            Self::Creative => &CREATIVE,
            Self::Morning => &MORNING,
            Self::Afternoon => &AFTERNOON,
            Self::Evening => &EVENING,
            Self::Night => &NIGHT,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownScenario(name.to_string()))
    }
}

/// The preferred attributes of a scenario and how much to trust them against the user's taste.
#[derive(Debug, PartialEq)]
pub struct ScenarioConfig {
    pub styles: &'static [&'static str],
    pub moods: &'static [&'static str],
    /// Color fragments, matched as substrings of an item's palette.
    pub colors: &'static [&'static str],
    pub categories: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub diversity_weight: f32,
    pub user_preference_weight: f32,
}

static WORK: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["calm", "cool"],
    colors: &["#ffffff", "#cccccc", "#999999"],
    categories: &["city", "abstract", "nature"],
    tags: &["minimal", "simple", "serene", "urban", "realistic"],
    diversity_weight: 0.3,
    user_preference_weight: 0.7,
};

static GAMING: ScenarioConfig = ScenarioConfig {
    styles: &["anime"],
    moods: &["energetic", "dark"],
    colors: &["#000000", "#111111", "#222222"],
    categories: &["anime", "abstract", "space", "city"],
    tags: &["anime", "acg", "dark", "neon", "scifi", "space", "abstract"],
    diversity_weight: 0.5,
    user_preference_weight: 0.5,
};

static READING: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["calm", "warm"],
    colors: &["#ffffff", "#abbcda", "#999999"],
    categories: &["nature", "abstract", "city"],
    tags: &["serene", "warm", "landscape", "nature", "simple"],
    diversity_weight: 0.4,
    user_preference_weight: 0.6,
};

static SLEEP: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["calm", "dark"],
    colors: &["#000000", "#111111", "#222222"],
    categories: &["space", "abstract", "nature"],
    tags: &["dark", "midnight", "nightscape", "starry", "space", "serene"],
    diversity_weight: 0.2,
    user_preference_weight: 0.8,
};

static CREATIVE: ScenarioConfig = ScenarioConfig {
    styles: &["anime"],
    moods: &["energetic"],
    colors: &["#ff", "#f7", "#a8"],
    categories: &["abstract", "city"],
    tags: &["abstract", "art", "design", "neon", "colorful"],
    diversity_weight: 0.6,
    user_preference_weight: 0.4,
};

static MORNING: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["energetic", "warm"],
    colors: &["#ffffff", "#abbcda", "#cccccc"],
    categories: &["nature", "city"],
    tags: &["fresh", "bright", "landscape", "urban"],
    diversity_weight: 0.4,
    user_preference_weight: 0.6,
};

static AFTERNOON: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["energetic", "warm"],
    colors: &["#ffffff", "#999999", "#abbcda"],
    categories: &["city", "nature"],
    tags: &["warm", "urban", "landscape"],
    diversity_weight: 0.5,
    user_preference_weight: 0.5,
};

static EVENING: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["calm", "warm"],
    colors: &["#111111", "#222222", "#999999"],
    categories: &["city", "nature"],
    tags: &["nightscape", "urban", "serene", "warm"],
    diversity_weight: 0.3,
    user_preference_weight: 0.7,
};

static NIGHT: ScenarioConfig = ScenarioConfig {
    styles: &["minimalist"],
    moods: &["calm", "dark", "cool"],
    colors: &["#000000", "#111111", "#222222"],
    categories: &["space", "abstract", "city"],
    tags: &["nightscape", "dark", "starry", "space", "urban"],
    diversity_weight: 0.2,
    user_preference_weight: 0.8,
};

impl ScenarioConfig {
    /// Scores how well an item fits the scenario and, if given, the user's taste.
    ///
    /// Color and tag matches accumulate per hit, so the sum isn't bounded by the nominal weights.
    pub fn score(&self, item: &Item, preferences: Option<&UserPreferences<'_>>) -> f32 {
        let mut score = 0.;
        if item.style().map_or(false, |style| self.styles.contains(&style)) {
            score += STYLE_WEIGHT;
        }
        if item.mood().map_or(false, |mood| self.moods.contains(&mood)) {
            score += MOOD_WEIGHT;
        }
        if let Some(palette) = item.color_palette() {
            for color in self.colors {
                if !color.is_empty() && palette.contains(color) {
                    score += COLOR_WEIGHT;
                }
            }
        }
        if self
            .categories
            .iter()
            .any(|category| item.categories().contains(*category))
        {
            score += CATEGORY_WEIGHT;
        }
        for tag in item.tags() {
            if self.tags.contains(&tag.as_str()) {
                score += TAG_WEIGHT;
            }
        }
        if let Some(preferences) = preferences {
            score += preferences.score(item) * self.user_preference_weight;
        }

        score + DIVERSITY_SCORE * self.diversity_weight
    }
}

/// The attributes of the items a user liked.
#[derive(Debug, Default)]
pub struct UserPreferences<'a> {
    tags: HashSet<&'a str>,
    styles: HashSet<&'a str>,
    moods: HashSet<&'a str>,
}

impl<'a> UserPreferences<'a> {
    pub fn new(store: &'a Store, user: &User, like_threshold: f32) -> Self {
        let mut preferences = Self::default();
        for item in user
            .liked(like_threshold)
            .filter_map(|rating| store.item(rating.item))
        {
            preferences
                .tags
                .extend(item.tags().iter().map(String::as_str));
            preferences.styles.extend(item.style());
            preferences.moods.extend(item.mood());
        }

        preferences
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.styles.is_empty() && self.moods.is_empty()
    }

    /// Scores the overlap of an item with the preferences, capped at `1`.
    pub fn score(&self, item: &Item) -> f32 {
        let tags = item
            .tags()
            .iter()
            .filter(|tag| self.tags.contains(tag.as_str()))
            .count();
        #[allow(clippy::cast_precision_loss)] // small number of tags
        let mut score = 0.1 * tags as f32;
        if item.style().map_or(false, |style| self.styles.contains(style)) {
            score += 0.2;
        }
        if item.mood().map_or(false, |mood| self.moods.contains(mood)) {
            score += 0.1;
        }

        score.min(1.)
    }
}

#[cfg(test)]
mod tests {
    use wallrec_test_utils::assert_approx_eq;

    use super::*;
    use crate::{
        id::UserId,
        store::tests::{item, rate},
    };

    #[test]
    fn test_parse() {
        assert_eq!("work".parse(), Ok(Scenario::Work));
        assert_eq!(" Night ".parse(), Ok(Scenario::Night));
        assert_eq!(
            "party".parse::<Scenario>(),
            Err(UnknownScenario("party".into())),
        );
        for scenario in Scenario::ALL {
            assert_eq!(scenario.to_string().parse(), Ok(scenario));
        }
    }

    #[test]
    fn test_from_hour() {
        let buckets = [
            (0, Scenario::Night),
            (5, Scenario::Night),
            (6, Scenario::Morning),
            (11, Scenario::Morning),
            (12, Scenario::Afternoon),
            (17, Scenario::Afternoon),
            (18, Scenario::Evening),
            (21, Scenario::Evening),
            (22, Scenario::Night),
            (23, Scenario::Night),
        ];
        for (hour, scenario) in buckets {
            assert_eq!(Scenario::from_hour(hour), scenario, "hour {hour}");
        }
    }

    #[test]
    fn test_weights_are_consistent() {
        for scenario in Scenario::ALL {
            let config = scenario.config();
            assert_approx_eq!(
                f32,
                config.diversity_weight + config.user_preference_weight,
                1.,
            );
        }
    }

    #[test]
    fn test_score_without_user() {
        let item = item(1)
            .with_style("minimalist")
            .with_mood("calm")
            .with_color_palette("#ffffff,#999999")
            .with_categories(["city"])
            .with_tags(["serene", "urban", "cat"]);
        // 0.3 + 0.2 + 2 * 0.05 + 0.15 + 2 * 0.05 + 0.1 * 0.3
        assert_approx_eq!(f32, WORK.score(&item, None), 0.88, epsilon = 1e-6);

        let unrelated = crate::store::tests::item(2).with_style("anime");
        assert_approx_eq!(f32, WORK.score(&unrelated, None), 0.03, epsilon = 1e-6);
    }

    #[test]
    fn test_color_fragments_stack() {
        let item = item(1).with_color_palette("#ff00ff #f7f7f7 #a8a8a8");
        assert_approx_eq!(
            f32,
            CREATIVE.score(&item, None),
            0.15 + 0.06,
            epsilon = 1e-6,
        );
    }

    #[test]
    fn test_user_preferences() {
        let mut store = Store::new();
        store.insert_item(
            item(1)
                .with_tags(["space", "starry"])
                .with_style("minimalist")
                .with_mood("dark"),
        );
        store.insert_item(item(2).with_tags(["beach"]).with_style("anime"));
        rate(&mut store, 7, 1, 5., 0);
        rate(&mut store, 7, 2, 2., 1);
        let user = store.user(UserId::new(7)).unwrap();
        let preferences = UserPreferences::new(&store, user, 4.);
        assert!(!preferences.is_empty());

        let candidate = item(3)
            .with_tags(["space", "starry", "beach"])
            .with_style("minimalist")
            .with_mood("dark");
        assert_approx_eq!(f32, preferences.score(&candidate), 0.5, epsilon = 1e-6);
        let disliked = item(4).with_style("anime");
        assert_approx_eq!(f32, preferences.score(&disliked), 0.);

        // 0.3 style + 0.2 mood + 0.15 category + 2 * 0.05 tags + 0.5 * 0.8 + 0.1 * 0.2
        let candidate = candidate.with_categories(["space"]);
        assert_approx_eq!(
            f32,
            SLEEP.score(&candidate, Some(&preferences)),
            1.17,
            epsilon = 1e-6,
        );
    }

    #[test]
    fn test_user_preference_is_capped() {
        let tags = (0..20).map(|i| format!("t{i}")).collect::<Vec<_>>();
        let mut store = Store::new();
        store.insert_item(item(1).with_tags(tags.clone()));
        rate(&mut store, 1, 1, 4., 0);
        let user = store.user(UserId::new(1)).unwrap();
        let preferences = UserPreferences::new(&store, user, 4.);
        let candidate = item(2).with_tags(tags);
        assert_approx_eq!(f32, preferences.score(&candidate), 1.);
    }
}
