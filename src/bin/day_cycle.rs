//! Runs the shadow-actor engine against the in-memory host for a few
//! simulated days and logs what happens: promotions, wandering, curfew
//! returns and the pre-save restoration.

use changeling::core::config::EngineConfig;
use changeling::core::types::Gender;
use changeling::engine::ShadowEngine;
use changeling::host::memory::{MemoryContent, MemoryHost, MemoryPathfinder};
use changeling::host::{HostWorld, RelationshipStore};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Starting day-cycle demo");

    let mut host = MemoryHost::new();
    host.set_partner(Some("Wren"));
    host.spawn_minor("Violet", Gender::Female, 85);
    host.spawn_minor("Ash", Gender::Male, 83);
    host.spawn_minor("Briar", Gender::Female, 20);

    let mut pathfinder = MemoryPathfinder::new(42);
    let content = MemoryContent::new(true);
    let mut store = RelationshipStore::new();
    let mut engine = ShadowEngine::new(EngineConfig::default());

    let mut frame = 0u64;
    for day in 1..=3 {
        engine.on_day_started(&mut host, &mut pathfinder, &mut store);
        tracing::info!(
            "Day {}: {} minors known, {} proxies active",
            day,
            engine.registry().minor_count(),
            engine.lifecycle().proxy_count()
        );

        for time in (700..=2200).step_by(100) {
            host.set_time_of_day(time);
            engine.on_periodic_tick(&mut host, &mut pathfinder, &content);

            // The demo pathfinder "finishes" every route within the hour
            for id in engine.lifecycle().proxy_ids() {
                let walking = engine
                    .lifecycle()
                    .proxy(id)
                    .map(|p| p.has_controller())
                    .unwrap_or(false);
                if walking {
                    engine.on_route_complete(id);
                }
            }

            frame += 1;
            if engine.update_snapshot(frame) {
                tracing::info!("Snapshot changed at {} on day {}", time, day);
            }
        }

        for id in engine.lifecycle().proxy_ids() {
            tracing::info!(
                "Proxy {:?} ended the day in state {:?}",
                engine.lifecycle().proxy(id).map(|p| p.name.clone()),
                engine.proxy_state(id)
            );
        }

        engine.on_before_save(&mut host, &mut store);
        tracing::info!(
            "After save, home holds: {:?}",
            host.names_in(&host.home_location())
        );
        host.advance_day();
    }
}
