pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec![
            "Content-Type",
            "Content-Length",
            "Accept",
            "Origin",
            "User-Agent",
            "Access-Control-Request-Method",
            "Access-Control-Request-Headers",
        ])
        .allow_methods(vec!["POST", "GET", "OPTIONS"])
}
