//! Named policy options the ruler can enact once per turn to nudge the
//! society parameters. Effects are percentages applied multiplicatively, so
//! an option cannot move a parameter that sits at zero.

use rand::Rng;
use serde::Serialize;

use crate::{
    rng::Rando,
    society::{Society, SocietyParam},
    world::{Goods, World},
};

pub const OPTIONS_OFFERED: usize = 3;
/// A cash-in option needs its parameter strictly above this.
pub const CASH_IN_FLOOR: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionCategory {
    /// Swap one problem for another at no cost.
    Trade,
    Paid,
    PublicWorks,
    /// Take resources in exchange for worsening an existing problem.
    CashIn { requires: SocietyParam },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SocietyOption {
    pub name: &'static str,
    pub description: &'static str,
    pub category: OptionCategory,
    /// Negative components are income.
    pub cost: Goods,
    /// Percent change per parameter, in `SocietyParam::ALL` order.
    pub effects: [f64; 4],
}

impl SocietyOption {
    const fn new(
        name: &'static str,
        description: &'static str,
        category: OptionCategory,
        cost: Goods,
        effects: [f64; 4],
    ) -> Self {
        Self {
            name,
            description,
            category,
            cost,
            effects,
        }
    }

    pub fn effect(&self, param: SocietyParam) -> f64 {
        match param {
            SocietyParam::Corruption => self.effects[0],
            SocietyParam::Unrest => self.effects[1],
            SocietyParam::Decadence => self.effects[2],
            SocietyParam::Overextension => self.effects[3],
        }
    }

    /// Whether the option is worth offering given the treasury and society.
    pub fn is_valid(&self, treasury: Goods, society: &Society) -> bool {
        if !treasury.covers(self.cost) {
            return false;
        }
        match self.category {
            OptionCategory::CashIn { requires } => society.get(requires) > CASH_IN_FLOOR,
            _ => SocietyParam::ALL
                .iter()
                .any(|p| self.effect(*p) < 0.0 && society.get(*p) > 0.0),
        }
    }
}

use self::OptionCategory::{PublicWorks, Trade};
use crate::society::SocietyParam::{Corruption, Decadence, Overextension, Unrest};

const PAID: OptionCategory = OptionCategory::Paid;

const fn cash_in(requires: SocietyParam) -> OptionCategory {
    OptionCategory::CashIn { requires }
}

const CATALOG: [SocietyOption; 80] = [
    // trade-offs
    SocietyOption::new("Royal Guards Crack Down", "The guards root out corrupt officials, but their methods breed resentment.", Trade, Goods::ZERO, [-20.0, 30.0, 0.0, 0.0]),
    SocietyOption::new("Host a Bacchanalia", "A festival of indulgence calms the masses but encourages excess.", Trade, Goods::ZERO, [0.0, -20.0, 30.0, 0.0]),
    SocietyOption::new("Bread and Circuses", "Entertainment distracts from grievances but promotes decadence.", Trade, Goods::ZERO, [0.0, -15.0, 20.0, 0.0]),
    SocietyOption::new("Military Parade", "A show of force reassures citizens but stretches supply lines.", Trade, Goods::ZERO, [0.0, -15.0, 0.0, 20.0]),
    SocietyOption::new("Public Executions", "Harsh justice deters corruption but terrifies the populace.", Trade, Goods::ZERO, [-25.0, 35.0, 0.0, 0.0]),
    SocietyOption::new("Declare Martial Law", "Military rule restores order but overextends your forces.", Trade, Goods::ZERO, [0.0, -30.0, 0.0, 25.0]),
    SocietyOption::new("Courtly Reforms", "Curtailing noble privileges reduces decadence but invites bribery.", Trade, Goods::ZERO, [20.0, 0.0, -15.0, 0.0]),
    SocietyOption::new("Austerity Measures", "Cutting excess spending reduces decadence but angers citizens.", Trade, Goods::ZERO, [0.0, 25.0, -20.0, 0.0]),
    SocietyOption::new("Consolidate Borders", "Pulling back from distant lands reduces overextension but causes unrest.", Trade, Goods::ZERO, [0.0, 15.0, 0.0, -25.0]),
    SocietyOption::new("Provincial Autonomy", "Delegating power reduces strain but enables local corruption.", Trade, Goods::ZERO, [25.0, 0.0, 0.0, -20.0]),
    SocietyOption::new("Purge the Bureaucracy", "Dismissing corrupt officials strains administration.", Trade, Goods::ZERO, [-25.0, 0.0, 0.0, 20.0]),
    SocietyOption::new("Royal Wedding", "A grand celebration lifts spirits but encourages excess.", Trade, Goods::ZERO, [0.0, -15.0, 15.0, 0.0]),
    SocietyOption::new("Sumptuary Laws", "Restricting luxury goods reduces decadence but frustrates merchants.", Trade, Goods::ZERO, [0.0, 15.0, -20.0, 0.0]),
    SocietyOption::new("Tax Amnesty", "Forgiving debts calms the people but encourages future evasion.", Trade, Goods::ZERO, [25.0, -20.0, 0.0, 0.0]),
    SocietyOption::new("Forced Labor Camps", "Conscript labor eases territorial strain but breeds resentment.", Trade, Goods::ZERO, [0.0, 30.0, 0.0, -15.0]),
    SocietyOption::new("Noble Privileges", "Granting favors to lords calms unrest but invites corruption.", Trade, Goods::ZERO, [20.0, -15.0, 0.0, 0.0]),
    SocietyOption::new("Military Conscription", "Drafting soldiers reduces overextension but angers families.", Trade, Goods::ZERO, [0.0, 30.0, 0.0, -20.0]),
    SocietyOption::new("Religious Festival", "Sacred celebrations ease tensions but encourage indulgence.", Trade, Goods::ZERO, [0.0, -15.0, 15.0, 0.0]),
    SocietyOption::new("Redistribute Wealth", "Taking from the rich pleases the poor but creates new corruption.", Trade, Goods::ZERO, [0.0, -20.0, 0.0, 0.0]),
    SocietyOption::new("Expand Bureaucracy", "More officials manage territory better but take their cut.", Trade, Goods::ZERO, [20.0, 0.0, 0.0, -15.0]),
    // paid in gold
    SocietyOption::new("Hire Civil Administrators", "Trained officials manage territories, but some will skim funds.", PAID, Goods::new(5, 0), [5.0, 0.0, 0.0, -10.0]),
    SocietyOption::new("Public Support Campaign", "Propaganda calms the masses but requires extended presence.", PAID, Goods::new(10, 0), [0.0, -20.0, 0.0, 10.0]),
    SocietyOption::new("Bribe Officials", "Payoffs smooth administration but set a bad example.", PAID, Goods::new(8, 0), [0.0, 0.0, 10.0, -15.0]),
    SocietyOption::new("Hire Mercenaries", "Foreign soldiers maintain order but extend commitments.", PAID, Goods::new(12, 0), [0.0, -15.0, 0.0, 10.0]),
    SocietyOption::new("Sponsor Artists", "Patronage redirects excess into culture, though some funds vanish.", PAID, Goods::new(6, 0), [5.0, 0.0, -10.0, 0.0]),
    SocietyOption::new("Fund Schools", "Education reduces discontent but creates ambitious officials.", PAID, Goods::new(8, 0), [5.0, -15.0, 0.0, 0.0]),
    SocietyOption::new("Road Maintenance", "Better roads ease travel but disrupt local communities.", PAID, Goods::new(5, 0), [0.0, 5.0, 0.0, -10.0]),
    SocietyOption::new("Harbor Improvements", "Port upgrades ease logistics, though contracts attract corruption.", PAID, Goods::new(10, 0), [5.0, 0.0, 0.0, -15.0]),
    SocietyOption::new("Establish Granaries", "Food reserves calm unrest but require territorial commitment.", PAID, Goods::new(7, 0), [0.0, -15.0, 0.0, 5.0]),
    SocietyOption::new("Train Local Militia", "Armed citizens reduce unrest but require coordination.", PAID, Goods::new(8, 0), [0.0, -10.0, 0.0, 10.0]),
    SocietyOption::new("Diplomatic Missions", "Envoys reduce border tensions but indulge in luxuries.", PAID, Goods::new(12, 0), [0.0, 0.0, 10.0, -15.0]),
    SocietyOption::new("Reform Tax Collection", "Efficient collection reduces corruption but angers taxpayers.", PAID, Goods::new(6, 0), [-15.0, 10.0, 0.0, 0.0]),
    SocietyOption::new("Establish Courts", "Justice reduces corruption but creates resentment among criminals.", PAID, Goods::new(10, 0), [-20.0, 10.0, 0.0, 0.0]),
    SocietyOption::new("Subsidize Merchants", "Trade support reduces corruption but encourages luxury goods.", PAID, Goods::new(8, 0), [-10.0, 0.0, 10.0, 0.0]),
    SocietyOption::new("Public Health Initiative", "Medicine calms unrest but officials enjoy the benefits.", PAID, Goods::new(7, 0), [0.0, -15.0, 5.0, 0.0]),
    SocietyOption::new("Border Fortifications", "Defenses reduce overextension but breed garrison discontent.", PAID, Goods::new(15, 0), [0.0, 5.0, 0.0, -20.0]),
    SocietyOption::new("Secret Police", "Spies suppress unrest but become corrupt themselves.", PAID, Goods::new(10, 0), [15.0, -20.0, 0.0, 0.0]),
    SocietyOption::new("Appease Nobility", "Gifts to lords reduce their excess but encourage graft.", PAID, Goods::new(12, 0), [10.0, 0.0, -15.0, 0.0]),
    SocietyOption::new("Census and Survey", "Better records ease administration but create new officials.", PAID, Goods::new(5, 0), [10.0, 0.0, 0.0, -10.0]),
    SocietyOption::new("Emergency Relief", "Aid calms crises but requires extended presence.", PAID, Goods::new(8, 0), [0.0, -20.0, 0.0, 5.0]),
    // public works, gold and materials
    SocietyOption::new("Build a Temple", "Sacred spaces reduce decadence but displace residents.", PublicWorks, Goods::new(2, 10), [0.0, 10.0, -20.0, 0.0]),
    SocietyOption::new("Build a Courthouse", "Centers of justice reduce corruption but create resentment.", PublicWorks, Goods::new(4, 20), [-25.0, 10.0, 0.0, 0.0]),
    SocietyOption::new("Build an Amphitheater", "Entertainment reduces unrest but encourages excess.", PublicWorks, Goods::new(5, 15), [0.0, -20.0, 10.0, 0.0]),
    SocietyOption::new("Build Aqueducts", "Clean water calms citizens but extends infrastructure.", PublicWorks, Goods::new(6, 25), [0.0, -15.0, 0.0, 5.0]),
    SocietyOption::new("Build City Walls", "Fortifications reduce overextension but alarm neighbors.", PublicWorks, Goods::new(8, 30), [0.0, 5.0, 0.0, -20.0]),
    SocietyOption::new("Build a Palace Wing", "Royal grandeur reduces decadence through focus, but invites graft.", PublicWorks, Goods::new(10, 35), [15.0, 0.0, -25.0, 0.0]),
    SocietyOption::new("Build Public Baths", "Bathing facilities calm citizens but encourage luxury.", PublicWorks, Goods::new(4, 15), [0.0, -15.0, 10.0, 0.0]),
    SocietyOption::new("Build a Monument", "Grand structures channel excess but officials take their cut.", PublicWorks, Goods::new(3, 20), [5.0, 0.0, -15.0, 0.0]),
    SocietyOption::new("Build a Granary", "Food storage calms unrest but requires more territory.", PublicWorks, Goods::new(3, 12), [0.0, -15.0, 0.0, 5.0]),
    SocietyOption::new("Build Barracks", "Military housing eases logistics but alarms citizens.", PublicWorks, Goods::new(5, 18), [0.0, 10.0, 0.0, -15.0]),
    SocietyOption::new("Build a Marketplace", "Trade centers reduce corruption but extend commitments.", PublicWorks, Goods::new(4, 15), [-10.0, 0.0, 0.0, 10.0]),
    SocietyOption::new("Build a Library", "Knowledge reduces decadence but creates ambitious scholars.", PublicWorks, Goods::new(6, 20), [5.0, 0.0, -15.0, 0.0]),
    SocietyOption::new("Build an Arena", "Gladiatorial games distract citizens but encourage excess.", PublicWorks, Goods::new(7, 25), [0.0, -25.0, 15.0, 0.0]),
    SocietyOption::new("Build a Shrine", "Small temples reduce decadence but cause minor disputes.", PublicWorks, Goods::new(2, 8), [0.0, 5.0, -10.0, 0.0]),
    SocietyOption::new("Build a Watchtower", "Observation posts ease patrols but worry locals.", PublicWorks, Goods::new(3, 10), [0.0, 5.0, 0.0, -10.0]),
    SocietyOption::new("Build Gardens", "Beauty reduces decadence but officials claim credit.", PublicWorks, Goods::new(4, 12), [5.0, 0.0, -15.0, 0.0]),
    SocietyOption::new("Build a Treasury", "Secure vaults reduce corruption but enable decadence.", PublicWorks, Goods::new(8, 25), [-20.0, 0.0, 10.0, 0.0]),
    SocietyOption::new("Build a Hospital", "Healing reduces unrest but creates entitled officials.", PublicWorks, Goods::new(5, 18), [5.0, -20.0, 0.0, 0.0]),
    SocietyOption::new("Build an Academy", "Education reduces corruption but spreads decadent ideas.", PublicWorks, Goods::new(7, 22), [-15.0, 0.0, 10.0, 0.0]),
    SocietyOption::new("Build a Harbor", "Port facilities ease logistics but invite corruption.", PublicWorks, Goods::new(6, 20), [10.0, 0.0, 0.0, -15.0]),
    // cash-ins
    SocietyOption::new("Accept Gift from Wealthy Merchant", "A merchant offers gold in exchange for looking the other way.", cash_in(Corruption), Goods::new(-5, 0), [20.0, 0.0, 0.0, 0.0]),
    SocietyOption::new("Sell Government Positions", "Offices go to the highest bidder, filling your coffers.", cash_in(Corruption), Goods::new(-10, 0), [35.0, 0.0, 0.0, 0.0]),
    SocietyOption::new("Auction Tax Collection Rights", "Private collectors pay handsomely for the privilege.", cash_in(Corruption), Goods::new(-20, 0), [50.0, 0.0, 0.0, 0.0]),
    SocietyOption::new("Confiscate Rebel Properties", "Seize the holdings of those who oppose you.", cash_in(Unrest), Goods::new(-10, 0), [0.0, 30.0, 0.0, 0.0]),
    SocietyOption::new("Enforce Emergency Taxation", "Desperate times call for desperate measures.", cash_in(Unrest), Goods::new(-20, 0), [0.0, 45.0, 0.0, 0.0]),
    SocietyOption::new("Raid Temple Treasuries", "The gods will understand, hopefully.", cash_in(Unrest), Goods::new(-5, 0), [0.0, 25.0, 0.0, 0.0]),
    SocietyOption::new("Host Lavish Tournament", "Nobles pay dearly for the honor of competing.", cash_in(Decadence), Goods::new(-10, 0), [0.0, 0.0, 30.0, 0.0]),
    SocietyOption::new("Sell Royal Favors", "Titles and privileges for those who can afford them.", cash_in(Decadence), Goods::new(-20, 0), [0.0, 0.0, 45.0, 0.0]),
    SocietyOption::new("License Vice Dens", "Gambling houses and pleasure palaces pay their dues.", cash_in(Decadence), Goods::new(-5, 0), [0.0, 0.0, 25.0, 0.0]),
    SocietyOption::new("Demand Tribute from Frontiers", "Distant provinces must prove their loyalty with gold.", cash_in(Overextension), Goods::new(-10, 0), [0.0, 0.0, 0.0, 30.0]),
    SocietyOption::new("Exploit Border Resources", "Strip the frontier lands of their wealth.", cash_in(Overextension), Goods::new(-20, 0), [0.0, 0.0, 0.0, 45.0]),
    SocietyOption::new("Accept Tribal Tribute", "A border tribe offers materials for protection.", cash_in(Overextension), Goods::new(0, -10), [0.0, 0.0, 0.0, 25.0]),
    SocietyOption::new("Hire Corrupt Contractors", "They cut corners, but deliver materials cheap.", cash_in(Corruption), Goods::new(0, -20), [30.0, 0.0, 0.0, 0.0]),
    SocietyOption::new("Accept Embezzled Supplies", "Don't ask where these building materials came from.", cash_in(Corruption), Goods::new(0, -30), [45.0, 0.0, 0.0, 0.0]),
    SocietyOption::new("Conscript Labor Gangs", "Force the discontented to build for the realm.", cash_in(Unrest), Goods::new(0, -20), [0.0, 35.0, 0.0, 0.0]),
    SocietyOption::new("Demolish Sacred Groves", "Ancient forests become building materials.", cash_in(Unrest), Goods::new(0, -30), [0.0, 40.0, 0.0, 0.0]),
    SocietyOption::new("Repurpose Festival Decorations", "Last year's excess becomes this year's materials.", cash_in(Decadence), Goods::new(0, -10), [0.0, 0.0, 20.0, 0.0]),
    SocietyOption::new("Salvage Abandoned Pleasure Gardens", "Tear down monuments to excess for practical use.", cash_in(Decadence), Goods::new(0, -20), [0.0, 0.0, 30.0, 0.0]),
    SocietyOption::new("Strip Frontier Fortifications", "Pull back defenses for their valuable materials.", cash_in(Overextension), Goods::new(0, -30), [0.0, 0.0, 0.0, 40.0]),
    SocietyOption::new("Absorb Migrant Craftsmen", "Refugees bring skills and supplies, but strain borders.", cash_in(Overextension), Goods::new(0, -10), [0.0, 0.0, 0.0, 25.0]),
];

pub fn catalog() -> &'static [SocietyOption] {
    &CATALOG
}

pub fn find(name: &str) -> Option<&'static SocietyOption> {
    CATALOG.iter().find(|o| o.name == name)
}

/// The whole catalog in a fresh random order, dealt once per turn.
pub fn shuffled_catalog(rng: &mut impl Rng) -> Vec<&'static SocietyOption> {
    let mut options: Vec<&'static SocietyOption> = CATALOG.iter().collect();
    rng.shuffle(&mut options);
    options
}

/// The first few valid options of this turn's deal.
pub fn available_options(world: &World) -> Vec<&'static SocietyOption> {
    world
        .society_options
        .iter()
        .copied()
        .filter(|o| o.is_valid(world.treasury, &world.society))
        .take(OPTIONS_OFFERED)
        .collect()
}

pub fn can_apply_society_option(world: &World, option: &SocietyOption) -> bool {
    world.society_options.iter().any(|o| o.name == option.name)
        && option.is_valid(world.treasury, &world.society)
}

/// Pay for the option, apply its effects and withdraw it for the rest of the
/// turn.
pub fn apply_society_option(world: &mut World, option: &SocietyOption) -> bool {
    if !can_apply_society_option(world, option) {
        return false;
    }
    world.spend(option.cost);
    for param in SocietyParam::ALL {
        world
            .society
            .scale(param, 1.0 + option.effect(param) / 100.0);
    }
    world.society_options.retain(|o| o.name != option.name);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::world::{HexMap, Terrain};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dealt_world(seed: u64) -> World {
        let mut world = World::new(HexMap::uniform(5, Terrain::Plains), Difficulty::Normal);
        world.society_options = shuffled_catalog(&mut ChaCha8Rng::seed_from_u64(seed));
        world
    }

    #[test]
    fn catalog_has_twenty_of_each_category() {
        let count = |f: fn(&OptionCategory) -> bool| {
            catalog().iter().filter(|o| f(&o.category)).count()
        };
        assert_eq!(count(|c| *c == Trade), 20);
        assert_eq!(count(|c| *c == PAID), 20);
        assert_eq!(count(|c| *c == PublicWorks), 20);
        assert_eq!(count(|c| matches!(c, OptionCategory::CashIn { .. })), 20);
    }

    #[test]
    fn calm_realm_is_offered_nothing() {
        let world = dealt_world(3);
        assert!(available_options(&world).is_empty());
    }

    #[test]
    fn unrest_unlocks_up_to_three_options() {
        let mut world = dealt_world(3);
        world.society.set(Unrest, 40.0);
        let offered = available_options(&world);
        assert_eq!(offered.len(), OPTIONS_OFFERED);
        for option in offered {
            let reduces_unrest = option.effect(Unrest) < 0.0;
            let cashes_unrest = option.category == cash_in(Unrest);
            assert!(reduces_unrest || cashes_unrest, "{}", option.name);
        }
    }

    #[test]
    fn applying_scales_parameters_and_withdraws_the_option() {
        let mut world = dealt_world(5);
        world.society.set(Corruption, 40.0);
        world.society.set(Unrest, 10.0);
        let option = find("Royal Guards Crack Down").unwrap();

        assert!(apply_society_option(&mut world, option));
        assert!((world.society.corruption() - 32.0).abs() < 1e-9);
        assert!((world.society.unrest() - 13.0).abs() < 1e-9);
        assert!(!apply_society_option(&mut world, option), "only once per deal");
    }

    #[test]
    fn cash_in_pays_out_and_needs_its_floor() {
        let mut world = dealt_world(6);
        let option = find("Sell Government Positions").unwrap();
        world.society.set(Corruption, 20.0);
        assert!(!can_apply_society_option(&world, option));

        world.society.set(Corruption, 30.0);
        let before = world.treasury;
        assert!(apply_society_option(&mut world, option));
        assert_eq!(world.treasury.gold, before.gold + 10);
        assert!((world.society.corruption() - 40.5).abs() < 1e-9);
    }
}
