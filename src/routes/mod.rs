use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use crate::handlers::{admin, auth, bookings, fare, incentives, loyalty, trips};
use crate::middleware::auth::{auth_middleware, require_admin, require_customer, require_driver};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Create role-specific governor layers
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let customer_governor = create_role_governor(RateLimitedRole::Customer);
    // Create IP-based governor for public routes
    let public_governor = create_public_governor();

    // Public routes (IP-based rate limiting)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    let fare_routes = Router::new()
        .route("/estimate", get(fare::estimate))
        .layer(public_governor);

    // Trip routes: shared by customers and drivers; role checks live in the
    // handlers since the surface is mixed
    let trip_routes = Router::new()
        .route("/", post(trips::create_trip))
        .route("/", get(trips::list_trips))
        .route("/{id}", get(trips::get_trip))
        .route("/{id}/accept", patch(trips::accept_trip))
        .route("/{id}/start", patch(trips::start_trip))
        .route("/{id}/complete", patch(trips::complete_trip))
        .route("/{id}/cancel", patch(trips::cancel_trip))
        .route("/{id}/rate", post(trips::rate_trip))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Booking routes (back-office dispatchers; requires auth + admin role)
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/", get(bookings::list_bookings))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}", patch(bookings::update_booking))
        .route("/{id}", delete(bookings::delete_booking))
        .route("/{id}/status", patch(bookings::update_booking_status))
        .route("/{id}/assign-driver", patch(bookings::assign_driver))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Loyalty routes (requires auth + customer role)
    let loyalty_routes = Router::new()
        .route("/profile", get(loyalty::get_profile))
        .route("/redeem", post(loyalty::redeem))
        .layer(customer_governor)
        .layer(middleware::from_fn(require_customer))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    let driver_routes = Router::new()
        .route("/incentives", get(incentives::list_incentives))
        .route("/incentives/{id}/claim", post(incentives::claim_incentive))
        .route("/earnings", get(incentives::my_earnings))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin fleet management (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/cabs", post(admin::create_cab))
        .route("/cabs", get(admin::list_cabs))
        .route("/cabs/{id}/status", patch(admin::update_cab_status))
        .route("/drivers", get(admin::list_drivers))
        .route("/incentives", post(admin::create_incentive))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/fare", fare_routes)
        .nest("/api/trips", trip_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/loyalty", loyalty_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
