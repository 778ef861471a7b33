//! Nested Routes Demo
//!
//! Demonstrates nested resolution with lazy children, an index route, a
//! guard and a catch-all. Each navigation prints the chain of payloads a
//! renderer would mount, outermost first.
//!
//! Run with `RUST_LOG=debug cargo run --example nested_demo` to watch the
//! traversal.

use futures::StreamExt;
use route_traverser::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn routes() -> Routes {
    vec![RouteNode::new("/")
        .component("AppShell")
        .index(RouteNode::pathless().component("HomePage").into())
        .children(vec![
            RouteNode::new("dashboard")
                .component("DashboardLayout")
                .index(RouteNode::pathless().component("OverviewPage").into())
                .children(vec![
                    RouteNode::new("analytics").component("AnalyticsPage").into(),
                    RouteNode::new("settings")
                        .guard("admin")
                        .component("SettingsPage")
                        .into(),
                ])
                .into(),
            RouteNode::new("products")
                .component("ProductsLayout")
                .load_children(|| async {
                    Ok(vec![
                        RouteNode::new(":id").component("ProductDetail").into(),
                    ])
                })
                .into(),
            RouteNode::new("*").component("NotFoundPage").into(),
        ])
        .into()]
}

fn describe(found: &Match) -> String {
    let chain: Vec<&str> = found
        .routes
        .iter()
        .filter_map(|route| {
            route
                .component
                .sync_value()
                .and_then(|component| component.downcast_ref::<&'static str>())
                .copied()
        })
        .collect();

    format!("{} -> {}", found.location_change.path, chain.join(" > "))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let is_admin = Arc::new(AtomicBool::new(false));
    let admin = Arc::clone(&is_admin);

    let router = Router::builder()
        .routes(routes())
        .guard_singleton(
            "admin",
            guard_fn(move |_| {
                let allowed = admin.load(Ordering::SeqCst);
                async move { allowed }
            }),
        )
        .build();

    let location = LocationChannel::new("/");
    let instruction = router.instruction(location.clone());
    let mut matches = instruction.subscribe();

    let first = matches.next().await;
    if let Some(found) = first {
        println!("{}", describe(&found));
    }

    let navigations = [
        "/dashboard",
        "/dashboard/analytics",
        "/dashboard/settings",
        "/products/42?color=red",
        "/somewhere/else",
    ];

    for path in navigations {
        location.push(path);
        match matches.next().await {
            Some(found) => println!("{}", describe(&found)),
            None => break,
        }
    }

    is_admin.store(true, Ordering::SeqCst);
    location.push("/dashboard/settings");
    if let Some(found) = matches.next().await {
        println!("{} (as admin)", describe(&found));
    }

    if let Some(current) = instruction.current() {
        println!(
            "current params: {:?}, query: {}",
            current.route_params.all(),
            current.query_params.to_query_string()
        );
    }
}
