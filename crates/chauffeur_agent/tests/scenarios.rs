//! End-to-end decision scenarios: a synthetic world, a recording order
//! sink, and the engine reacting to events.

use chauffeur_agent::brain::{Brain, CardPlay, MoveOrder, OrderSink, OrderVerb, ranked_pickups};
use chauffeur_agent::error::AgentError;
use chauffeur_agent::world::{PassengerLocation, World};
use chauffeur_protocol::{CardAction, CardKind, GameEvent, PowerUpSnapshot, ServerMessage, Tile};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Default)]
struct RecordingSink {
    orders: Vec<MoveOrder>,
    cards: Vec<CardPlay>,
}

impl OrderSink for RecordingSink {
    fn send_order(&mut self, order: MoveOrder) -> Result<(), AgentError> {
        self.orders.push(order);
        Ok(())
    }

    fn send_card(&mut self, play: CardPlay) -> Result<(), AgentError> {
        self.cards.push(play);
        Ok(())
    }
}

fn brain() -> Brain {
    Brain::with_rng(StdRng::seed_from_u64(7))
}

fn world_from(setup: serde_json::Value) -> World {
    let ServerMessage::Setup(setup) =
        ServerMessage::decode(&setup.to_string()).expect("decode setup")
    else {
        panic!("expected setup");
    };
    World::from_setup(&setup).expect("build world")
}

/// Planned orders end with the departure step; the actual destination is
/// the tile before it.
fn destination_of(order: &MoveOrder) -> Tile {
    assert!(order.path.len() >= 2, "order has no destination");
    order.path[order.path.len() - 2]
}

fn card_snapshot(card: CardKind, ok_to_play: bool) -> PowerUpSnapshot {
    PowerUpSnapshot {
        card,
        company: None,
        passenger: None,
        player: None,
        ok_to_play,
    }
}

/// One long open boulevard; every bus stop sits on row 1.
fn boulevard(players: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    let mut setup = serde_json::json!({
        "msg": "setup",
        "my-guid": "me",
        "map": {"width": 20, "height": 3,
                "rows": ["....................",
                         "....................",
                         "...................."]},
        "players": players,
        "companies": [],
        "stores": [],
        "passengers": [],
        "powerups": []
    });
    setup
        .as_object_mut()
        .expect("object")
        .extend(extra.as_object().expect("object").clone());
    setup
}

#[test]
fn scoring_breaks_ties_by_list_order() {
    // path costs per point: 10/5 = 2.0, 8/4 = 2.0 (tie), 6/2 = 3.0
    let world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({
            "companies": [
                {"name": "L1", "bus-stop-x": 3, "bus-stop-y": 1},
                {"name": "L2", "bus-stop-x": 2, "bus-stop-y": 1},
                {"name": "L3", "bus-stop-x": 1, "bus-stop-y": 1},
                {"name": "D1", "bus-stop-x": 6, "bus-stop-y": 1},
                {"name": "D2", "bus-stop-x": 4, "bus-stop-y": 1},
                {"name": "D3", "bus-stop-x": 0, "bus-stop-y": 1}
            ],
            "passengers": [
                {"name": "First", "points-delivered": 5, "lobby": "L1", "destination": "D1"},
                {"name": "Second", "points-delivered": 4, "lobby": "L2", "destination": "D2"},
                {"name": "Third", "points-delivered": 2, "lobby": "L3", "destination": "D3"}
            ]
        }),
    ));

    let ranked = ranked_pickups(&world, world.me);
    let names: Vec<&str> = ranked
        .iter()
        .map(|&id| world.passengers[id.0].name.as_str())
        .collect();
    assert_eq!(names, vec!["First", "Second", "Third"]);
}

#[test]
fn setup_orders_ready_toward_the_best_pickup() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({
            "companies": [
                {"name": "L1", "bus-stop-x": 3, "bus-stop-y": 1},
                {"name": "D1", "bus-stop-x": 6, "bus-stop-y": 1}
            ],
            "passengers": [
                {"name": "First", "points-delivered": 5, "lobby": "L1", "destination": "D1"}
            ]
        }),
    ));
    let mut sink = RecordingSink::default();
    brain().setup(&mut world, &mut sink).expect("setup");

    assert_eq!(sink.orders.len(), 1);
    let order = &sink.orders[0];
    assert_eq!(order.verb, OrderVerb::Ready);
    assert_eq!(destination_of(order), Tile::new(3, 1));
    assert_eq!(order.pick_up, vec!["First"]);
    // the order was mirrored locally
    assert_eq!(world.me().limo.path, order.path);
}

#[test]
fn setup_with_no_eligible_passenger_fails_cleanly() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({}),
    ));
    let mut sink = RecordingSink::default();
    assert!(matches!(
        brain().setup(&mut world, &mut sink),
        Err(AgentError::NoEligiblePassenger)
    ));
    assert!(sink.orders.is_empty());
}

#[test]
fn enemy_refusal_reroutes_to_the_nearest_safe_company() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({
            "companies": [
                {"name": "Target", "bus-stop-x": 5, "bus-stop-y": 1},
                {"name": "Near", "bus-stop-x": 3, "bus-stop-y": 1},
                {"name": "Far", "bus-stop-x": 8, "bus-stop-y": 1}
            ],
            "passengers": [
                {"name": "Alice", "points-delivered": 10, "destination": "Target",
                 "enemies": ["Eve"]},
                {"name": "Eve", "points-delivered": 3, "lobby": "Target", "enemies": ["Alice"]},
                {"name": "Bob", "points-delivered": 3, "lobby": "Near"}
            ]
        }),
    ));
    let alice = world.passenger_by_name("Alice").expect("Alice");
    world.set_passenger_location(alice, PassengerLocation::Riding(world.me));

    let me = world.me;
    let mut sink = RecordingSink::default();
    brain()
        .game_status(&mut world, &mut sink, GameEvent::PassengerRefusedEnemy, me)
        .expect("handled");

    // no rider-mover card in hand, so the agent diverts: Near hosts only
    // Bob, who is no enemy of Alice, and is closer than Far
    assert!(sink.cards.is_empty());
    assert_eq!(sink.orders.len(), 1);
    assert_eq!(destination_of(&sink.orders[0]), Tile::new(3, 1));
}

#[test]
fn enemy_refusal_plays_a_ready_rider_mover_and_keeps_course() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({
            "companies": [
                {"name": "Target", "bus-stop-x": 5, "bus-stop-y": 1},
                {"name": "Near", "bus-stop-x": 3, "bus-stop-y": 1}
            ],
            "passengers": [
                {"name": "Alice", "points-delivered": 10, "destination": "Target",
                 "enemies": ["Eve"]},
                {"name": "Eve", "points-delivered": 3, "lobby": "Target", "enemies": ["Alice"]}
            ]
        }),
    ));
    let alice = world.passenger_by_name("Alice").expect("Alice");
    world.set_passenger_location(alice, PassengerLocation::Riding(world.me));
    let mover = world.resolve_power_up(&card_snapshot(CardKind::MovePassenger, true));
    world.powerups.hand.push(mover);

    let me = world.me;
    let mut sink = RecordingSink::default();
    brain()
        .game_status(&mut world, &mut sink, GameEvent::PassengerRefusedEnemy, me)
        .expect("handled");

    assert_eq!(sink.cards.len(), 1);
    let play = &sink.cards[0];
    assert_eq!(play.action, CardAction::Play);
    assert_eq!(play.card, CardKind::MovePassenger);
    assert_eq!(play.passenger.as_deref(), Some("Eve"));
    // still heading for the original destination
    assert_eq!(destination_of(&sink.orders[0]), Tile::new(5, 1));
    assert!(world.powerups.hand.is_empty());
}

#[test]
fn empty_coffee_pot_overrides_the_next_pickup() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({
            "companies": [
                {"name": "L1", "bus-stop-x": 9, "bus-stop-y": 1},
                {"name": "D1", "bus-stop-x": 12, "bus-stop-y": 1}
            ],
            "stores": [
                {"name": "Brew", "bus-stop-x": 7, "bus-stop-y": 1},
                {"name": "Drip", "bus-stop-x": 2, "bus-stop-y": 1}
            ],
            "passengers": [
                {"name": "First", "points-delivered": 5, "lobby": "L1", "destination": "D1"}
            ]
        }),
    ));
    world.me_mut().limo.coffee_servings = 0;

    let me = world.me;
    let mut sink = RecordingSink::default();
    brain()
        .game_status(&mut world, &mut sink, GameEvent::PassengerDelivered, me)
        .expect("handled");

    // a pending pickup exists, but the empty pot wins: nearest store first
    assert_eq!(sink.orders.len(), 1);
    assert_eq!(destination_of(&sink.orders[0]), Tile::new(2, 1));
    assert_eq!(sink.orders[0].pick_up, vec!["First"]);
}

#[test]
fn refused_boarding_for_lack_of_coffee_heads_to_a_store() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 4, "limo-y": 1}]),
        serde_json::json!({
            "stores": [{"name": "Brew", "bus-stop-x": 7, "bus-stop-y": 1}]
        }),
    ));
    let me = world.me;
    let mut sink = RecordingSink::default();
    brain()
        .game_status(&mut world, &mut sink, GameEvent::PassengerRefusedNoCoffee, me)
        .expect("handled");
    assert_eq!(destination_of(&sink.orders[0]), Tile::new(7, 1));
}

#[test]
fn restock_with_nobody_waiting_sends_no_order() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({}),
    ));
    let me = world.me;
    let mut sink = RecordingSink::default();
    brain()
        .game_status(&mut world, &mut sink, GameEvent::CoffeeStoreCarRestocked, me)
        .expect("handled");
    assert!(sink.orders.is_empty());
    assert!(sink.cards.is_empty());
}

#[test]
fn update_tick_draws_every_card_before_playing_any() {
    let mut world = world_from(boulevard(
        serde_json::json!([{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1}]),
        serde_json::json!({}),
    ));
    world.me_mut().max_cards_in_hand = 3;
    let a = world.resolve_power_up(&card_snapshot(CardKind::RelocateAllCars, false));
    let b = world.resolve_power_up(&card_snapshot(CardKind::AllOtherCarsQuarterSpeed, false));
    world.powerups.deck = vec![a, b];

    let me = world.me;
    let mut sink = RecordingSink::default();
    brain()
        .game_status(&mut world, &mut sink, GameEvent::Update, me)
        .expect("handled");

    // hand 0, deck 2, max 3: both cards come over in one pass, nothing is
    // played
    let actions: Vec<CardAction> = sink.cards.iter().map(|c| c.action).collect();
    assert_eq!(actions, vec![CardAction::Draw, CardAction::Draw]);
    assert!(world.powerups.deck.is_empty());
    assert_eq!(world.powerups.hand, vec![a, b]);
    assert!(sink.orders.is_empty());
}

#[test]
fn targeted_card_is_skipped_when_no_opponent_carries_a_passenger() {
    let mut world = world_from(boulevard(
        serde_json::json!([
            {"guid": "me", "name": "Us", "limo-x": 2, "limo-y": 1},
            {"guid": "them", "name": "Rival", "limo-x": 9, "limo-y": 1}
        ]),
        serde_json::json!({
            "companies": [{"name": "L1", "bus-stop-x": 2, "bus-stop-y": 1}]
        }),
    ));
    world.me_mut().max_cards_in_hand = 1;
    let stop = world.resolve_power_up(&card_snapshot(CardKind::StopCar, true));
    world.powerups.hand = vec![stop];

    // park on a bus stop so the hand matures, then run many ticks: the
    // only candidate targets a loaded opponent, and there is none
    let me = world.me;
    let mut sink = RecordingSink::default();
    let mut engine = brain();
    for _ in 0..20 {
        engine
            .game_status(&mut world, &mut sink, GameEvent::Update, me)
            .expect("handled");
    }
    assert!(sink.cards.is_empty());
    assert_eq!(world.powerups.hand, vec![stop]);
}

#[test]
fn rival_snatching_our_target_abandons_the_plan() {
    let mut world = world_from(boulevard(
        serde_json::json!([
            {"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 1},
            {"guid": "them", "name": "Rival", "limo-x": 4, "limo-y": 1}
        ]),
        serde_json::json!({
            "companies": [
                {"name": "L1", "bus-stop-x": 5, "bus-stop-y": 1},
                {"name": "D1", "bus-stop-x": 9, "bus-stop-y": 1}
            ],
            "passengers": [
                {"name": "First", "points-delivered": 5, "lobby": "L1", "destination": "D1"}
            ]
        }),
    ));
    let mut sink = RecordingSink::default();
    let mut engine = brain();
    engine.setup(&mut world, &mut sink).expect("setup");
    assert!(!world.me().limo.path.is_empty());

    // the rival picks First up before we get there
    let first = world.passenger_by_name("First").expect("First");
    let rival = world.player_by_guid("them").expect("rival");
    world.set_passenger_location(first, PassengerLocation::Riding(rival));

    engine
        .game_status(&mut world, &mut sink, GameEvent::PassengerPickedUp, rival)
        .expect("handled");

    assert!(world.me().limo.path.is_empty());
    assert!(world.me().pick_up.is_empty());
    // no counter-order was sent for someone else's event
    assert_eq!(sink.orders.len(), 1);
}
