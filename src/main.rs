#[rocket::launch]
fn rocket() -> _ {
    let rocket = rollcall_server::rocket();
    log::info!("Starting Rollcall API Server");
    rocket
}
