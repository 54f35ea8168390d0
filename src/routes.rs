use crate::{
    api::{attendance, history},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / requests_per_min as u64;
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // only None for a zero period or burst, both excluded above
        .expect("valid rate limiter settings");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let actions_limiter = Arc::new(build_limiter(config.rate_actions_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // one mutating request per button press
                    .service(
                        web::resource("/check-in")
                            .wrap(actions_limiter.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/start-break")
                            .wrap(actions_limiter.clone())
                            .route(web::post().to(attendance::start_break)),
                    )
                    .service(
                        web::resource("/end-break")
                            .wrap(actions_limiter.clone())
                            .route(web::post().to(attendance::end_break)),
                    )
                    .service(
                        web::resource("/check-out")
                            .wrap(actions_limiter.clone())
                            .route(web::post().to(attendance::check_out)),
                    )
                    // read side
                    .service(web::resource("/calendar").route(web::get().to(attendance::calendar)))
                    .service(web::resource("/day").route(web::get().to(attendance::day)))
                    .service(
                        web::resource("/summary/{user_id}")
                            .route(web::get().to(attendance::summary)),
                    )
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}").route(web::put().to(attendance::edit_attendance)),
                    ),
            )
            .service(
                web::resource("/history")
                    .app_data(web::QueryConfig::default().error_handler(history::query_error))
                    .route(web::get().to(history::list_history)),
            ),
    );
}
