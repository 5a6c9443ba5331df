use rocket::Route;

pub mod kiosk;
pub mod public;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(kiosk::routes());
    routes.extend(public::routes());
    routes
}
