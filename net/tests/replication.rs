use orbitile_net::{
    NetCompatibilityRules, NetElement, NetEvent, NetField, NetFloat, NetGroup, NetSubGroup,
    NetTopGroup,
};
use proptest::prelude::*;

const RULES: NetCompatibilityRules = NetCompatibilityRules::CURRENT;

#[derive(Default)]
struct Counters {
    fields: [NetField<i64>; 10],
}

impl NetGroup for Counters {
    fn for_each_element(&self, visit: &mut dyn FnMut(&dyn NetElement)) {
        for field in &self.fields {
            visit(field);
        }
    }

    fn for_each_element_mut(&mut self, visit: &mut dyn FnMut(&mut dyn NetElement)) {
        for field in &mut self.fields {
            visit(field);
        }
    }
}

#[test]
fn batched_delta_is_smaller_than_separate_ones() {
    let mut master = NetTopGroup::new(Counters::default());
    let (_, mut cursor) = master.write_net_state(0, RULES);

    let mut separate = 0;
    for (slot, value) in [(1, 40), (4, -7), (8, 1_000)] {
        master.group_mut().fields[slot].set(value);
        let (bytes, next) = master.write_net_state(cursor, RULES);
        separate += bytes.len();
        cursor = next;
    }

    for (slot, value) in [(1, 41), (4, -8), (8, 1_001)] {
        master.group_mut().fields[slot].set(value);
    }
    let (batched, _) = master.write_net_state(cursor, RULES);
    assert!(!batched.is_empty());
    assert!(
        batched.len() < separate,
        "batched {} bytes, separate {separate}",
        batched.len()
    );
}

#[derive(Default)]
struct Cargo {
    label: NetField<String>,
    fuel: NetFloat,
}

impl NetGroup for Cargo {
    fn for_each_element(&self, visit: &mut dyn FnMut(&dyn NetElement)) {
        visit(&self.label);
        visit(&self.fuel);
    }

    fn for_each_element_mut(&mut self, visit: &mut dyn FnMut(&mut dyn NetElement)) {
        visit(&mut self.label);
        visit(&mut self.fuel);
    }
}

#[derive(Default)]
struct Ship {
    level: NetField<i64>,
    docked: NetField<Option<bool>>,
    speed: NetFloat,
    cargo: NetSubGroup<Cargo>,
    horn: NetEvent,
}

impl NetGroup for Ship {
    fn for_each_element(&self, visit: &mut dyn FnMut(&dyn NetElement)) {
        visit(&self.level);
        visit(&self.docked);
        visit(&self.speed);
        visit(&self.cargo);
        visit(&self.horn);
    }

    fn for_each_element_mut(&mut self, visit: &mut dyn FnMut(&mut dyn NetElement)) {
        visit(&mut self.level);
        visit(&mut self.docked);
        visit(&mut self.speed);
        visit(&mut self.cargo);
        visit(&mut self.horn);
    }
}

#[derive(Clone, Debug)]
enum Change {
    Level(i64),
    Docked(Option<bool>),
    Speed(f32),
    Label(String),
    Fuel(f32),
    Horn,
    Sync,
}

fn change() -> impl Strategy<Value = Change> {
    prop_oneof![
        any::<i64>().prop_map(Change::Level),
        any::<Option<bool>>().prop_map(Change::Docked),
        (-1.0e6_f32..1.0e6).prop_map(Change::Speed),
        "[a-z]{0,8}".prop_map(Change::Label),
        (0.0_f32..100.0).prop_map(Change::Fuel),
        Just(Change::Horn),
        Just(Change::Sync),
    ]
}

fn assert_mirrors(master: &Ship, slave: &Ship) -> Result<(), TestCaseError> {
    prop_assert_eq!(master.level.get(), slave.level.get());
    prop_assert_eq!(master.docked.get(), slave.docked.get());
    prop_assert_eq!(master.speed.get().to_bits(), slave.speed.get().to_bits());
    prop_assert_eq!(master.cargo.group().label.get(), slave.cargo.group().label.get());
    prop_assert_eq!(
        master.cargo.group().fuel.get().to_bits(),
        slave.cargo.group().fuel.get().to_bits()
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn slave_matches_master_after_every_sync(changes in prop::collection::vec(change(), 0..40)) {
        let mut master = NetTopGroup::new(Ship::default());
        let mut slave = NetTopGroup::new(Ship::default());
        let (bytes, mut cursor) = master.write_net_state(0, RULES);
        slave.read_net_state(&bytes, 0.0, RULES).expect("full state");

        let mut horns = 0;
        let mut heard = 0;
        for change in changes.into_iter().chain(std::iter::once(Change::Sync)) {
            let ship = master.group_mut();
            match change {
                Change::Level(value) => ship.level.set(value),
                Change::Docked(value) => ship.docked.set(value),
                Change::Speed(value) => ship.speed.set(value),
                Change::Label(value) => ship.cargo.group_mut().label.set(value),
                Change::Fuel(value) => ship.cargo.group_mut().fuel.set(value),
                Change::Horn => {
                    ship.horn.trigger();
                    horns += 1;
                }
                Change::Sync => {
                    let (bytes, next) = master.write_net_state(cursor, RULES);
                    cursor = next;
                    slave.read_net_state(&bytes, 0.0, RULES).expect("delta");
                    heard += slave.group_mut().horn.pull_occurrences();
                    assert_mirrors(master.group(), slave.group())?;
                }
            }
        }
        prop_assert_eq!(heard, horns);
    }
}
