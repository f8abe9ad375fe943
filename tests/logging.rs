use screen_ink::logging;

#[test]
fn init_can_run_more_than_once() {
    logging::init(false);
    logging::init(true);
    tracing::info!("logging still usable after repeated init");
}
