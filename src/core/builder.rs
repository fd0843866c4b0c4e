//! Weekly menu model builder.
//!
//! Turns one user's nutrition target, the reference snapshot and the job's
//! registered ingredients into a [`LinearProgram`]:
//!
//! - `x[d,r]` binary: recipe `r` is served on day `d`
//! - `used[k]` binary: some ingredient of equivalence class `k` is used in the week
//! - `registered_used[n]` binary: registered ingredient `n` (or an equivalent) is used
//! - `slack[d,r,i]` ≥ 0: distance of the recipe's quantity of `i` from the
//!   nearest package multiple
//!
//! The objective minimizes the number of ingredient classes, rewards using
//! registered ingredients and penalizes package-multiple deviation.

use crate::{
    config::{
        nutrients::NutrientVocabulary,
        settings::ModelConfig,
    },
    core::{
        DAYS,
        equivalence::EquivalenceResolver,
        program::{Domain, LinearExpr, LinearProgram, VarId},
        snapshot::{Category, Recipe, ReferenceSnapshot},
        target::{BoundPolicy, NutritionTarget, nutrient_bounds},
    },
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Everything one job contributes to a model build.
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    /// Shared reference data
    pub snapshot: &'a ReferenceSnapshot,
    /// Equivalence classes over the snapshot's active ingredients
    pub resolver: &'a EquivalenceResolver,
    /// The user's nutrition target
    pub target: &'a NutritionTarget,
    /// Whether the menstruating-cohort iron floor applies
    pub menstruation: bool,
    /// Whether energy and PFC constraints apply
    pub use_pfc: bool,
    /// Registered ingredient names mapped to quantities
    pub registered_items: &'a BTreeMap<String, f64>,
}

/// A built program plus the index maps needed to read a solution back.
#[derive(Debug, Clone)]
pub struct MenuModel {
    /// The optimization problem
    pub program: LinearProgram,
    selection: BTreeMap<(u8, i64), VarId>,
    used: BTreeMap<String, VarId>,
    registered_used: BTreeMap<String, VarId>,
    slack: BTreeMap<(u8, i64, String), VarId>,
    categories: BTreeMap<i64, Category>,
    nutrient_keys: Vec<String>,
}

impl MenuModel {
    /// `x[d,r]`
    #[must_use]
    pub fn selection_var(&self, day: u8, recipe_id: i64) -> Option<VarId> {
        self.selection.get(&(day, recipe_id)).copied()
    }

    /// `used[k]` for a diversity key (an equivalence representative)
    #[must_use]
    pub fn used_var(&self, key: &str) -> Option<VarId> {
        self.used.get(key).copied()
    }

    /// Every diversity key, sorted.
    pub fn diversity_keys(&self) -> impl Iterator<Item = &str> {
        self.used.keys().map(String::as_str)
    }

    /// `registered_used[n]`
    #[must_use]
    pub fn registered_var(&self, name: &str) -> Option<VarId> {
        self.registered_used.get(name).copied()
    }

    /// `slack[d,r,i]`
    #[must_use]
    pub fn slack_var(&self, day: u8, recipe_id: i64, ingredient: &str) -> Option<VarId> {
        self.slack
            .get(&(day, recipe_id, ingredient.to_string()))
            .copied()
    }

    /// Recipe ids in the model, ascending.
    pub fn recipe_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.categories.keys().copied()
    }

    /// Meal category of a recipe in the model.
    #[must_use]
    pub fn category(&self, recipe_id: i64) -> Option<Category> {
        self.categories.get(&recipe_id).copied()
    }

    /// Recipe-side nutrient keys that received a constraint.
    #[must_use]
    pub fn constrained_nutrients(&self) -> &[String] {
        &self.nutrient_keys
    }

    /// One-line description of the model's size for diagnostics.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} variables, {} constraints, nutrients [{}]",
            self.program.variables().len(),
            self.program.constraints().len(),
            self.nutrient_keys.join(", ")
        )
    }
}

fn nutrition_constraint_name(key: &str) -> String {
    format!("nutrition[{key}]")
}

struct Builder<'a> {
    input: &'a ModelInput<'a>,
    config: &'a ModelConfig,
    recipes: Vec<&'a Recipe>,
    program: LinearProgram,
    selection: BTreeMap<(u8, i64), VarId>,
}

impl<'a> Builder<'a> {
    fn x(&self, day: u8, recipe_id: i64) -> VarId {
        self.selection[&(day, recipe_id)]
    }

    fn is_special_staple(&self, recipe: &Recipe) -> bool {
        recipe.category == Category::Staple
            && self.config.special_staple_kinds.contains(&recipe.subcategory)
    }

    fn day_sum(&self, day: u8, keep: impl Fn(&Recipe) -> bool) -> LinearExpr {
        LinearExpr::sum(
            self.recipes
                .iter()
                .filter(|r| keep(r))
                .map(|r| self.x(day, r.id)),
        )
    }

    fn add_selection_variables(&mut self) {
        for day in DAYS {
            for recipe in &self.recipes {
                let var = self
                    .program
                    .add_variable(format!("x[{day},{}]", recipe.id), Domain::Binary);
                self.selection.insert((day, recipe.id), var);
            }
        }
    }

    /// One staple; one main or one special staple; one side; one soup; 3-4 items.
    fn add_daily_structure(&mut self) {
        for day in DAYS {
            let staples = self.day_sum(day, |r| r.category == Category::Staple);
            let mut mains = self.day_sum(day, |r| r.category == Category::Main);
            mains.extend(&self.day_sum(day, |r| self.is_special_staple(r)));
            let sides = self.day_sum(day, |r| r.category == Category::Side);
            let soups = self.day_sum(day, |r| r.category == Category::Soup);
            let items = self.day_sum(day, |_| true);

            self.program.add_eq(format!("staple_count[{day}]"), staples, 1.0);
            self.program.add_eq(format!("main_count[{day}]"), mains, 1.0);
            self.program.add_eq(format!("side_count[{day}]"), sides, 1.0);
            self.program.add_eq(format!("soup_count[{day}]"), soups, 1.0);
            self.program.add_constraint(
                format!("items_per_day[{day}]"),
                items,
                Some(f64::from(self.config.min_items_per_day)),
                Some(f64::from(self.config.max_items_per_day)),
            );
        }
    }

    /// Weekly cap of a recipe.
    fn max_uses(&self, recipe: &Recipe) -> u32 {
        if self.is_special_staple(recipe) || recipe.subcategory == self.config.rice_kind {
            self.config.repeatable_max_uses
        } else {
            self.config.ordinary_max_uses
        }
    }

    /// Special staples and rice recipes may recur daily; others appear once.
    fn add_usage_limits(&mut self) {
        for recipe in &self.recipes {
            let cap = self.max_uses(recipe);
            let week = LinearExpr::sum(DAYS.into_iter().map(|d| self.x(d, recipe.id)));
            self.program
                .add_le(format!("recipe_usage[{}]", recipe.id), week, f64::from(cap));
        }
    }

    fn add_nutrition(&mut self, vocab: &NutrientVocabulary) -> Vec<String> {
        let policy = BoundPolicy {
            energy_band: self.config.energy_band,
            tolerance: self.config.tolerance,
        };
        let bounds = nutrient_bounds(
            self.input.target,
            vocab,
            policy,
            self.input.menstruation,
            self.input.use_pfc,
        );

        let mut constrained = Vec::new();
        for key in vocab.recipe_keys(self.input.use_pfc) {
            let Some(bound) = bounds.iter().find(|b| b.recipe_key == key) else {
                debug!("No bound for nutrient {}, constraint skipped", key);
                continue;
            };
            let total: LinearExpr = DAYS
                .into_iter()
                .flat_map(|d| self.recipes.iter().map(move |r| (d, r)))
                .map(|(d, r)| (self.x(d, r.id), r.nutrient(key)))
                .collect();
            self.program.add_constraint(
                nutrition_constraint_name(key),
                total,
                bound.lower,
                bound.upper,
            );
            constrained.push(key.to_string());
        }
        constrained
    }

    /// `Σ_{d,r} grams(r,i)·x[d,r]` summed over every ingredient in `members`.
    fn weekly_usage(&self, members: &BTreeSet<&str>) -> LinearExpr {
        let mut usage = LinearExpr::new();
        for day in DAYS {
            for recipe in &self.recipes {
                for member in members {
                    let grams = recipe.grams(member);
                    if grams > 0.0 {
                        usage.add_term(self.x(day, recipe.id), grams);
                    }
                }
            }
        }
        usage
    }

    /// Active ingredients grouped by representative.
    fn diversity_classes(&self) -> BTreeMap<String, BTreeSet<&'a str>> {
        let mut classes: BTreeMap<String, BTreeSet<&'a str>> = BTreeMap::new();
        for recipe in &self.recipes {
            for (name, &grams) in &recipe.ingredients {
                if grams > 0.0 {
                    classes
                        .entry(self.input.resolver.representative(name).to_string())
                        .or_default()
                        .insert(name.as_str());
                }
            }
        }
        classes
    }

    fn add_diversity(
        &mut self,
        classes: &BTreeMap<String, BTreeSet<&'a str>>,
    ) -> BTreeMap<String, VarId> {
        let mut used = BTreeMap::new();
        for (key, members) in classes {
            let var = self
                .program
                .add_variable(format!("used[{key}]"), Domain::Binary);
            let mut link = self.weekly_usage(members);
            link.add_term(var, -self.config.big_m.diversity);
            self.program
                .add_le(format!("ingredient_link[{key}]"), link, 0.0);
            used.insert(key.clone(), var);
        }
        used
    }

    fn add_registered(
        &mut self,
        classes: &BTreeMap<String, BTreeSet<&'a str>>,
    ) -> BTreeMap<String, VarId> {
        let mut registered = BTreeMap::new();
        for name in self.input.registered_items.keys() {
            let key = self.input.resolver.representative(name);
            let Some(members) = classes.get(key) else {
                debug!("Registered ingredient '{}' is not used by any recipe", name);
                continue;
            };
            let most = max_weekly_usage(&self.recipes, members, |r| self.max_uses(r));
            if most > self.config.big_m.registered {
                debug!(
                    "Registered class '{}' can reach {} g a week, above big-M {}; \
                     heavy use of it makes the model infeasible",
                    key, most, self.config.big_m.registered
                );
            }
            let var = self
                .program
                .add_variable(format!("registered_used[{name}]"), Domain::Binary);

            let mut link = self.weekly_usage(members);
            link.add_term(var, -self.config.big_m.registered);
            self.program
                .add_le(format!("registered_link[{name}]"), link, 0.0);

            let mut activation = LinearExpr::new();
            activation.add_term(var, 1.0);
            for day in DAYS {
                for recipe in &self.recipes {
                    if members.iter().any(|m| recipe.grams(m) > 0.0) {
                        activation.add_term(self.x(day, recipe.id), -1.0);
                    }
                }
            }
            self.program
                .add_le(format!("registered_activation[{name}]"), activation, 0.0);

            registered.insert(name.clone(), var);
        }
        registered
    }

    /// `slack ≥ x·amt − w·k` and `slack ≥ w·k − x·amt` with `k = round(amt / w)`,
    /// halves rounding to even.
    fn add_package_multiples(&mut self) -> BTreeMap<(u8, i64, String), VarId> {
        let mut slack = BTreeMap::new();
        for day in DAYS {
            for recipe in &self.recipes {
                for (ingredient, &amount) in &recipe.ingredients {
                    if amount <= 0.0 {
                        continue;
                    }
                    let Some(weight) = self.input.snapshot.unit_weight(ingredient) else {
                        continue;
                    };
                    let target = weight * (amount / weight).round_ties_even();
                    let x = self.x(day, recipe.id);
                    let s = self.program.add_variable(
                        format!("slack[{day},{},{ingredient}]", recipe.id),
                        Domain::NonNegative,
                    );

                    let over: LinearExpr = [(s, 1.0), (x, -amount)].into_iter().collect();
                    self.program.add_ge(
                        format!("package_multiple_over[{day},{},{ingredient}]", recipe.id),
                        over,
                        -target,
                    );
                    let under: LinearExpr = [(s, 1.0), (x, amount)].into_iter().collect();
                    self.program.add_ge(
                        format!("package_multiple_under[{day},{},{ingredient}]", recipe.id),
                        under,
                        target,
                    );

                    slack.insert((day, recipe.id, ingredient.clone()), s);
                }
            }
        }
        slack
    }
}

/// Grams of `members` used when every recipe containing them is served as
/// often as its cap allows.
fn max_weekly_usage(
    recipes: &[&Recipe],
    members: &BTreeSet<&str>,
    max_uses: impl Fn(&Recipe) -> u32,
) -> f64 {
    recipes
        .iter()
        .map(|recipe| {
            let grams: f64 = members.iter().map(|m| recipe.grams(m)).sum();
            grams * f64::from(max_uses(recipe))
        })
        .sum()
}

/// Builds the weekly menu model for one job.
#[must_use]
pub fn build_model(
    input: &ModelInput<'_>,
    config: &ModelConfig,
    vocab: &NutrientVocabulary,
) -> MenuModel {
    let mut builder = Builder {
        input,
        config,
        recipes: input.snapshot.recipes().collect(),
        program: LinearProgram::new(),
        selection: BTreeMap::new(),
    };

    builder.add_selection_variables();
    builder.add_daily_structure();
    builder.add_usage_limits();
    let nutrient_keys = builder.add_nutrition(vocab);

    let classes = builder.diversity_classes();
    let used = builder.add_diversity(&classes);
    let registered_used = builder.add_registered(&classes);
    let slack = builder.add_package_multiples();

    let weights = config.weights;
    let mut objective = LinearExpr::new();
    for &var in used.values() {
        objective.add_term(var, weights.ingredient);
    }
    // -w_reg·Σru + w_unused·Σ(1 - ru)
    for &var in registered_used.values() {
        objective.add_term(var, -weights.registered - weights.unused_registered);
        objective.add_constant(weights.unused_registered);
    }
    for &var in slack.values() {
        objective.add_term(var, weights.package_multiple);
    }
    builder.program.set_objective(objective);

    debug!(
        "Model built: {} variables, {} constraints, {} ingredient classes, {} registered",
        builder.program.variables().len(),
        builder.program.constraints().len(),
        used.len(),
        registered_used.len()
    );

    MenuModel {
        categories: builder.recipes.iter().map(|r| (r.id, r.category)).collect(),
        program: builder.program,
        selection: builder.selection,
        used,
        registered_used,
        slack,
        nutrient_keys,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::snapshot::Equivalence;
    use crate::test_utils::*;

    struct Fixture {
        snapshot: ReferenceSnapshot,
        resolver: EquivalenceResolver,
        target: NutritionTarget,
        registered: BTreeMap<String, f64>,
    }

    impl Fixture {
        fn new(registered: &[&str]) -> Self {
            let snapshot = sample_snapshot();
            let resolver = EquivalenceResolver::new(
                snapshot.equivalences(),
                &ModelConfig::default().equivalence_bridges,
                &snapshot.active_ingredients(),
            );
            Self {
                snapshot,
                resolver,
                target: sample_target(),
                registered: registered.iter().map(|n| ((*n).to_string(), 100.0)).collect(),
            }
        }

        fn build(&self, use_pfc: bool, menstruation: bool) -> MenuModel {
            let input = ModelInput {
                snapshot: &self.snapshot,
                resolver: &self.resolver,
                target: &self.target,
                menstruation,
                use_pfc,
                registered_items: &self.registered,
            };
            build_model(&input, &ModelConfig::default(), &NutrientVocabulary::default())
        }
    }

    fn assignment(model: &MenuModel, picks: &[(u8, i64)]) -> Vec<f64> {
        let mut values = vec![0.0; model.program.variables().len()];
        for &(day, recipe) in picks {
            values[model.selection_var(day, recipe).unwrap().index()] = 1.0;
        }
        values
    }

    #[test]
    fn test_selection_variables_cover_days_and_recipes() {
        let model = Fixture::new(&[]).build(true, false);
        let recipes: Vec<i64> = model.recipe_ids().collect();
        assert_eq!(recipes.len(), sample_snapshot().recipes().count());
        for day in DAYS {
            for &recipe in &recipes {
                assert!(model.selection_var(day, recipe).is_some());
            }
        }
        assert!(model.selection_var(8, recipes[0]).is_none());
    }

    #[test]
    fn test_valid_week_satisfies_structure() {
        let model = Fixture::new(&[]).build(false, false);
        let values = assignment(&model, &valid_week_picks());
        let structural: Vec<_> = model
            .program
            .violations(&values, 1e-6)
            .into_iter()
            .filter(|v| {
                v.name.starts_with("staple_count")
                    || v.name.starts_with("main_count")
                    || v.name.starts_with("side_count")
                    || v.name.starts_with("soup_count")
                    || v.name.starts_with("items_per_day")
                    || v.name.starts_with("recipe_usage")
            })
            .collect();
        assert!(structural.is_empty(), "unexpected violations: {structural:?}");
    }

    #[test]
    fn test_special_staple_fills_main_slot() {
        let model = Fixture::new(&[]).build(false, false);
        let main_count = model.program.find_constraint("main_count[1]").unwrap();
        let curry = model.selection_var(1, CURRY_ID).unwrap();
        let main = model.selection_var(1, MAIN_IDS[0]).unwrap();
        let rice = model.selection_var(1, RICE_ID).unwrap();
        let vars: Vec<VarId> = main_count.expr.terms().iter().map(|(v, _)| *v).collect();
        assert!(vars.contains(&curry));
        assert!(vars.contains(&main));
        assert!(!vars.contains(&rice));

        // Curry + side + soup on day 1 is a valid three-item day
        let mut picks = valid_week_picks();
        picks.retain(|&(d, _)| d != 1);
        picks.extend([(1, CURRY_ID), (1, SIDE_IDS[0]), (1, SOUP_IDS[0])]);
        let values = assignment(&model, &picks);
        let day_one: Vec<_> = model
            .program
            .violations(&values, 1e-6)
            .into_iter()
            .filter(|v| v.name.ends_with("[1]"))
            .collect();
        assert!(day_one.is_empty(), "unexpected violations: {day_one:?}");
    }

    #[test]
    fn test_missing_side_violates_side_count() {
        let model = Fixture::new(&[]).build(false, false);
        let mut picks = valid_week_picks();
        picks.retain(|&(d, r)| !(d == 3 && SIDE_IDS.contains(&r)));
        let values = assignment(&model, &picks);
        let names: Vec<String> = model
            .program
            .violations(&values, 1e-6)
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert!(names.contains(&"side_count[3]".to_string()));
        // Three items is still within the daily item range
        assert!(!names.contains(&"items_per_day[3]".to_string()));
    }

    #[test]
    fn test_too_few_items_violates_item_range() {
        let model = Fixture::new(&[]).build(false, false);
        let mut picks = valid_week_picks();
        picks.retain(|&(d, r)| !(d == 3 && (SIDE_IDS.contains(&r) || SOUP_IDS.contains(&r))));
        let values = assignment(&model, &picks);
        let names: Vec<String> = model
            .program
            .violations(&values, 1e-6)
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert!(names.contains(&"side_count[3]".to_string()));
        assert!(names.contains(&"soup_count[3]".to_string()));
        assert!(names.contains(&"items_per_day[3]".to_string()));
        assert!(!names.contains(&"items_per_day[2]".to_string()));
    }

    #[test]
    fn test_usage_caps_depend_on_subcategory() {
        let model = Fixture::new(&[]).build(true, false);
        let cap = |id: i64| {
            model
                .program
                .find_constraint(&format!("recipe_usage[{id}]"))
                .unwrap()
                .upper
                .unwrap()
        };
        assert_eq!(cap(RICE_ID), 7.0);
        assert_eq!(cap(CURRY_ID), 7.0);
        assert_eq!(cap(MAIN_IDS[0]), 1.0);
        assert_eq!(cap(SIDE_IDS[0]), 1.0);
    }

    #[test]
    fn test_no_pfc_model_excludes_energy_and_macros() {
        let fixture = Fixture::new(&[]);
        let with_pfc = fixture.build(true, false);
        let without = fixture.build(false, false);

        for key in ["カロリー(kcal)", "たんぱく質(g)", "脂質(g)", "炭水化物(g)"] {
            assert!(with_pfc.program.find_constraint(&nutrition_constraint_name(key)).is_some());
            assert!(without.program.find_constraint(&nutrition_constraint_name(key)).is_none());
            assert!(!without.constrained_nutrients().iter().any(|k| k == key));
        }
        assert!(without.program.find_constraint("nutrition[カルシウム(mg)]").is_some());
    }

    #[test]
    fn test_nutrient_without_bounds_is_skipped() {
        let model = Fixture::new(&[]).build(true, false);
        // The sample target declares nothing for vitamin D
        assert!(model.program.find_constraint("nutrition[ビタミンD(μg)]").is_none());
    }

    #[test]
    fn test_iron_constraint_uses_menstruation_floor() {
        let fixture = Fixture::new(&[]);
        let floor = |menstruation: bool| {
            fixture
                .build(true, menstruation)
                .program
                .find_constraint("nutrition[鉄(mg)]")
                .unwrap()
                .lower
                .unwrap()
        };
        assert!((floor(false) - 70.0 * 0.95).abs() < 1e-9);
        assert!((floor(true) - 100.0 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_equivalent_ingredients_share_one_used_variable() {
        let model = Fixture::new(&[]).build(true, false);

        // 白米 is declared with ご飯; the bridge pulls 米 into the same class.
        // Both ご飯 and 米 are active, so ご飯 represents the class.
        assert!(model.used_var("ご飯").is_some());
        assert!(model.used_var("米").is_none());
        assert!(model.used_var("白米").is_none());

        let link = model.program.find_constraint("ingredient_link[ご飯]").unwrap();
        let rice_dish = model.selection_var(2, RICE_ID).unwrap();
        let onigiri = model.selection_var(2, ONIGIRI_ID).unwrap();
        let vars: Vec<VarId> = link.expr.terms().iter().map(|(v, _)| *v).collect();
        assert!(vars.contains(&rice_dish));
        assert!(vars.contains(&onigiri));

        // Using 米 anywhere forces used[ご飯] = 1
        let mut values = vec![0.0; model.program.variables().len()];
        values[onigiri.index()] = 1.0;
        let link_violated = |values: &[f64]| {
            model
                .program
                .violations(values, 1e-6)
                .iter()
                .any(|v| v.name == "ingredient_link[ご飯]")
        };
        assert!(link_violated(&values));
        values[model.used_var("ご飯").unwrap().index()] = 1.0;
        assert!(!link_violated(&values));

        // The diversity term counts the class once
        let objective_used: Vec<VarId> = model
            .program
            .objective()
            .terms()
            .iter()
            .filter(|(_, c)| (*c - 5.0).abs() < 1e-9)
            .map(|(v, _)| *v)
            .collect();
        assert_eq!(objective_used.len(), model.diversity_keys().count());
        assert!(objective_used.contains(&model.used_var("ご飯").unwrap()));
    }

    #[test]
    fn test_registered_ingredient_terms() {
        let model = Fixture::new(&["鶏肉", "キャビア"]).build(true, false);

        let chicken = model.registered_var("鶏肉").unwrap();
        assert!(model.registered_var("キャビア").is_none());

        let coefficient = model
            .program
            .objective()
            .terms()
            .iter()
            .find(|(v, _)| *v == chicken)
            .map(|(_, c)| *c)
            .unwrap();
        assert_eq!(coefficient, -20.0);
        assert_eq!(model.program.objective().constant(), 15.0);

        let link = model.program.find_constraint("registered_link[鶏肉]").unwrap();
        assert!(link.expr.terms().iter().any(|&(v, c)| v == chicken && c == -1000.0));

        // Not using chicken forces the indicator to 0
        let activation = model
            .program
            .find_constraint("registered_activation[鶏肉]")
            .unwrap();
        let mut values = vec![0.0; model.program.variables().len()];
        values[chicken.index()] = 1.0;
        assert!(activation.expr.evaluate(&values) > 0.0);
    }

    #[test]
    fn test_package_multiple_slack_bounds() {
        let model = Fixture::new(&[]).build(true, false);

        // Tofu comes in 300 g packs; the soup uses 120 g → nearest multiple 0
        let tofu_soup = SOUP_IDS[1];
        let s = model.slack_var(4, tofu_soup, "豆腐").unwrap();
        let over = model
            .program
            .find_constraint(&format!("package_multiple_over[4,{tofu_soup},豆腐]"))
            .unwrap();
        assert_eq!(over.lower, Some(-0.0));
        let under = model
            .program
            .find_constraint(&format!("package_multiple_under[4,{tofu_soup},豆腐]"))
            .unwrap();
        assert_eq!(under.lower, Some(0.0));

        let x = model.selection_var(4, tofu_soup).unwrap();
        let mut values = vec![0.0; model.program.variables().len()];
        values[x.index()] = 1.0;
        values[s.index()] = 120.0;
        assert!(over.expr.evaluate(&values) >= -1e-9);

        // Ingredients without a unit weight are exempt
        assert!(model.slack_var(4, tofu_soup, "味噌").is_none());
    }

    #[test]
    fn test_package_multiple_half_rounds_to_even() {
        let model = Fixture::new(&[]).build(true, false);

        // 150 g is exactly half a 300 g pack; the tie goes to the even multiple 0
        let tofu_main = MAIN_IDS[6];
        let under = model
            .program
            .find_constraint(&format!("package_multiple_under[1,{tofu_main},豆腐]"))
            .unwrap();
        assert_eq!(under.lower, Some(0.0));
        let over = model
            .program
            .find_constraint(&format!("package_multiple_over[1,{tofu_main},豆腐]"))
            .unwrap();
        assert_eq!(over.lower.map(f64::abs), Some(0.0));

        // Serving the dish needs the full 150 g of slack
        let x = model.selection_var(1, tofu_main).unwrap();
        let s = model.slack_var(1, tofu_main, "豆腐").unwrap();
        let mut values = vec![0.0; model.program.variables().len()];
        values[x.index()] = 1.0;
        values[s.index()] = 149.0;
        assert!(over.expr.evaluate(&values) < 0.0);
        values[s.index()] = 150.0;
        assert!(over.expr.evaluate(&values) >= -1e-9);
    }

    #[test]
    fn test_max_weekly_usage_follows_usage_caps() {
        let fixture = Fixture::new(&[]);
        let config = ModelConfig::default();
        let recipes: Vec<&Recipe> = fixture.snapshot.recipes().collect();
        let cap = |r: &Recipe| {
            if r.subcategory == config.rice_kind || config.special_staple_kinds.contains(&r.subcategory)
            {
                config.repeatable_max_uses
            } else {
                config.ordinary_max_uses
            }
        };

        // Plain rice and curry may recur daily, onigiri once
        let rice: BTreeSet<&str> = ["ご飯", "米"].into_iter().collect();
        let most = max_weekly_usage(&recipes, &rice, cap);
        assert_eq!(most, 150.0 * 7.0 + 100.0 + 200.0 * 7.0);
        assert!(most > config.big_m.registered);

        let chicken: BTreeSet<&str> = ["鶏肉"].into_iter().collect();
        assert_eq!(max_weekly_usage(&recipes, &chicken, cap), 220.0);
    }

    #[test]
    fn test_summary_reports_model_size() {
        let model = sample_model();
        let summary = model.summary();
        assert!(summary.starts_with(&format!(
            "{} variables, {} constraints",
            model.program.variables().len(),
            model.program.constraints().len()
        )));
        assert!(summary.contains("鉄(mg)"));
        assert!(summary.contains("カルシウム(mg)"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let fixture = Fixture::new(&["鶏肉"]);
        let a = fixture.build(true, false);
        let b = fixture.build(true, false);
        assert_eq!(a.program.variables(), b.program.variables());
        assert_eq!(a.program.constraints(), b.program.constraints());
        assert_eq!(a.program.objective(), b.program.objective());
    }

    #[test]
    fn test_equivalence_declared_in_snapshot() {
        let snapshot = sample_snapshot();
        assert!(snapshot.equivalences().contains(&Equivalence {
            canonical: "白米".to_string(),
            equal: "ご飯".to_string(),
        }));
    }
}
