use tabled::Table;

use crate::{
    error, info, success,
    types::NewBundle,
    utils,
};

use super::context;

pub async fn list_bundles() {
    let tokens = context::token_manager().await;
    let user_id = context::user_id(&tokens).await;
    let bundles = context::bundles().await.for_user(&user_id).await;

    if bundles.is_empty() {
        info!("No bundles yet. Add one with shufflr bundles add <intro> <main>.");
        return;
    }
    println!("{}", Table::new(utils::bundle_table_rows(&bundles)));
}

/// Pins `main` behind `intro`. Both accept bare ids and `spotify:track:` URIs.
pub async fn add_bundle(intro: String, main: String, strict: bool) {
    let tokens = context::token_manager().await;
    let user_id = context::user_id(&tokens).await;

    let mut ids = match utils::parse_track_ids(&[intro, main]) {
        Ok(ids) => ids.into_iter(),
        Err(e) => error!("{}", e),
    };
    let (Some(intro), Some(main)) = (ids.next(), ids.next()) else {
        error!("A bundle needs an intro and a main track.");
    };

    let created = context::bundles()
        .await
        .create(NewBundle {
            user_id,
            intro,
            main,
            strict,
        })
        .await;

    match created {
        Ok(bundle) => success!(
            "Added bundle {}: {} -> {}{}",
            bundle.id,
            bundle.intro,
            bundle.main,
            if bundle.strict { " (strict)" } else { "" }
        ),
        Err(e) => error!("Cannot add bundle. Err: {}", e),
    }
}

pub async fn set_bundle_strict(id: u64, strict: bool) {
    match context::bundles().await.set_strict(id, strict).await {
        Ok(bundle) => success!(
            "Bundle {} is {}",
            bundle.id,
            if bundle.strict { "strict" } else { "not strict" }
        ),
        Err(e) => error!("Cannot update bundle. Err: {}", e),
    }
}

pub async fn remove_bundle(id: u64) {
    match context::bundles().await.delete(id).await {
        Ok(bundle) => success!("Removed bundle {}", bundle.id),
        Err(e) => error!("Cannot remove bundle. Err: {}", e),
    }
}
