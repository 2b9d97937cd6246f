//! Integration tests for the tool resolution cache: atomic rebuilds,
//! single-flight guarding and install-once availability checks.

mod helpers;

use helpers::fakes::{FakeInstaller, FakeLocator};
use helpers::fixtures::full_locator;
use std::path::PathBuf;
use std::sync::Arc;
use toolwright::tools::{
    EnsureOutcome, FORMAT_TOOLS, GOFMT, GOIMPORTS, RebuildOutcome, RootKey, TEST_TOOLS,
    ToolResolutionCache, missing_formatter_spec,
};

fn format_cache(locator: Arc<FakeLocator>, installer: Arc<FakeInstaller>) -> ToolResolutionCache {
    ToolResolutionCache::new(FORMAT_TOOLS, locator).with_installer(
        installer,
        FORMAT_TOOLS.iter().filter_map(|tool| missing_formatter_spec(tool)),
    )
}

#[tokio::test]
async fn lookups_during_rebuild_see_the_previous_complete_table() {
    let locator = full_locator();
    let cache = Arc::new(ToolResolutionCache::new(TEST_TOOLS, locator.clone()));
    cache.set_project_roots(&["/work".to_string()]).await;
    assert_eq!(cache.lookup("go", None), Some(PathBuf::from("/fake/bin/go")));

    // Every tool moves; the rebuild is held at the locator.
    locator.set("go", "/new/bin/go");
    locator.set("cover", "/new/bin/cover");
    let (entered, open) = locator.install_gate();
    let rebuild = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.rebuild().await }
    });
    entered.notified().await;

    assert!(cache.is_rebuilding());
    assert!(!cache.is_ready());
    assert_eq!(cache.lookup("go", None), Some(PathBuf::from("/fake/bin/go")));
    assert_eq!(
        cache.lookup("cover", None),
        Some(PathBuf::from("/fake/bin/cover"))
    );
    assert_eq!(cache.ensure_available("go").await, EnsureOutcome::NotReady);

    locator.remove_gate();
    open.notify_waiters();
    let outcome = rebuild.await.unwrap();

    assert_eq!(outcome, RebuildOutcome::Rebuilt { entries: 4 });
    assert!(!cache.is_rebuilding());
    assert_eq!(cache.lookup("go", None), Some(PathBuf::from("/new/bin/go")));
    assert_eq!(
        cache.lookup("cover", None),
        Some(PathBuf::from("/new/bin/cover"))
    );
}

#[tokio::test]
async fn second_rebuild_while_running_is_turned_away() {
    let locator = full_locator();
    let cache = Arc::new(ToolResolutionCache::new(TEST_TOOLS, locator.clone()));

    let (entered, open) = locator.install_gate();
    let first = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.rebuild().await }
    });
    entered.notified().await;
    let calls_before = locator.calls();

    assert_eq!(cache.rebuild().await, RebuildOutcome::AlreadyRunning);
    assert_eq!(locator.calls(), calls_before);

    locator.remove_gate();
    open.notify_waiters();
    assert_eq!(first.await.unwrap(), RebuildOutcome::Rebuilt { entries: 2 });
    assert!(cache.is_ready());
}

#[tokio::test]
async fn failed_rebuild_keeps_the_previous_table() {
    let locator = full_locator();
    let cache = ToolResolutionCache::new(TEST_TOOLS, locator.clone());
    assert_eq!(
        cache.set_project_roots(&["/work".to_string()]).await,
        RebuildOutcome::Rebuilt { entries: 4 }
    );

    locator.set("go", "/new/bin/go");
    locator.panic_on("cover");

    assert_eq!(cache.rebuild().await, RebuildOutcome::Failed);
    assert!(!cache.is_rebuilding());
    assert!(cache.is_ready());
    assert_eq!(cache.lookup("go", None), Some(PathBuf::from("/fake/bin/go")));

    locator.stop_panicking();

    assert_eq!(cache.rebuild().await, RebuildOutcome::Rebuilt { entries: 4 });
    assert_eq!(cache.lookup("go", None), Some(PathBuf::from("/new/bin/go")));
}

#[tokio::test]
async fn tool_found_while_another_rebuild_runs_is_available() {
    let locator = Arc::new(FakeLocator::new());
    let cache = Arc::new(ToolResolutionCache::new(TEST_TOOLS, locator.clone()));
    cache.set_project_roots(&["/work".to_string()]).await;
    assert_eq!(cache.lookup("cover", None), None);

    locator.set("cover", "/usr/local/go/pkg/tool/cover");
    let (entered, open) = locator.install_gate();
    let ensure = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.ensure_available("cover").await }
    });
    entered.notified().await;
    let rebuild = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move { cache.rebuild().await }
    });
    entered.notified().await;
    assert!(cache.is_rebuilding());

    locator.remove_gate();
    open.notify_waiters();

    assert_eq!(
        ensure.await.unwrap(),
        EnsureOutcome::Available(PathBuf::from("/usr/local/go/pkg/tool/cover"))
    );
    assert_eq!(rebuild.await.unwrap(), RebuildOutcome::Rebuilt { entries: 2 });
    assert!(!cache.is_rebuilding());
    assert_eq!(
        cache.lookup("cover", None),
        Some(PathBuf::from("/usr/local/go/pkg/tool/cover"))
    );
}

#[tokio::test]
async fn absent_tools_are_never_cached() {
    let locator = Arc::new(FakeLocator::new());
    locator.set("go", "/fake/bin/go");
    let cache = ToolResolutionCache::new(TEST_TOOLS, locator.clone());

    cache.set_project_roots(&["/a".to_string(), "/b".to_string()]).await;

    assert_eq!(cache.len(), 3);
    assert!(cache.cached_path("cover", &RootKey::Global).is_none());
    assert!(
        cache
            .cached_path("cover", &RootKey::Project(PathBuf::from("/a")))
            .is_none()
    );
}

#[tokio::test]
async fn resolve_queries_locator_without_caching() {
    let locator = Arc::new(FakeLocator::new());
    let cache = ToolResolutionCache::new(TEST_TOOLS, locator.clone());
    cache.rebuild().await;

    locator.set("cover", "/late/bin/cover");

    assert_eq!(
        cache.resolve("cover", None).await,
        Some(PathBuf::from("/late/bin/cover"))
    );
    assert_eq!(cache.lookup("cover", None), None);
}

#[tokio::test]
async fn missing_tool_is_installed_once_per_session() {
    let locator = Arc::new(FakeLocator::new());
    let installer = Arc::new(FakeInstaller::failing(locator.clone()));
    let cache = format_cache(locator.clone(), installer.clone());
    cache.rebuild().await;

    assert_eq!(
        cache.ensure_available(GOIMPORTS).await,
        EnsureOutcome::InstallFailed
    );
    assert_eq!(
        cache.ensure_available(GOIMPORTS).await,
        EnsureOutcome::AlreadyAttempted
    );
    assert_eq!(installer.calls(), 1);

    let spec = &installer.requests()[0];
    assert_eq!(spec.name, GOFMT);
    assert_eq!(spec.package_name, GOIMPORTS);
    assert_eq!(spec.package_path, "golang.org/x/tools/cmd/goimports");
}

#[tokio::test]
async fn reset_allows_another_install_attempt() {
    let locator = Arc::new(FakeLocator::new());
    let installer = Arc::new(FakeInstaller::failing(locator.clone()));
    let cache = format_cache(locator.clone(), installer.clone());
    cache.rebuild().await;

    cache.ensure_available(GOIMPORTS).await;
    cache.reset_install_attempt(GOIMPORTS);
    assert!(!cache.install_attempted(GOIMPORTS));

    assert_eq!(
        cache.ensure_available(GOIMPORTS).await,
        EnsureOutcome::InstallFailed
    );
    assert_eq!(installer.calls(), 2);
}

#[tokio::test]
async fn successful_install_rebuilds_the_cache() {
    let locator = Arc::new(FakeLocator::new());
    let installer = Arc::new(FakeInstaller::succeeding(locator.clone()));
    let cache = format_cache(locator.clone(), installer.clone());
    cache.rebuild().await;
    assert!(cache.lookup(GOIMPORTS, None).is_none());

    assert_eq!(
        cache.ensure_available(GOIMPORTS).await,
        EnsureOutcome::Installed
    );
    assert_eq!(
        cache.lookup(GOIMPORTS, None),
        Some(PathBuf::from("/installed/bin/goimports"))
    );
    assert_eq!(
        cache.ensure_available(GOIMPORTS).await,
        EnsureOutcome::Available(PathBuf::from("/installed/bin/goimports"))
    );
}

#[tokio::test]
async fn stock_formatter_is_not_installable() {
    let locator = Arc::new(FakeLocator::new());
    let installer = Arc::new(FakeInstaller::succeeding(locator.clone()));
    let cache = format_cache(locator, installer.clone());

    assert_eq!(
        cache.ensure_available(GOFMT).await,
        EnsureOutcome::NotInstallable
    );
    assert_eq!(installer.calls(), 0);
}

#[tokio::test]
async fn tool_appearing_on_disk_triggers_rebuild() {
    let locator = Arc::new(FakeLocator::new());
    let installer = Arc::new(FakeInstaller::succeeding(locator.clone()));
    let cache = format_cache(locator.clone(), installer.clone());
    cache.rebuild().await;

    locator.set(GOFMT, "/usr/local/go/bin/gofmt");

    assert_eq!(
        cache.ensure_available(GOFMT).await,
        EnsureOutcome::Available(PathBuf::from("/usr/local/go/bin/gofmt"))
    );
    assert_eq!(
        cache.lookup(GOFMT, None),
        Some(PathBuf::from("/usr/local/go/bin/gofmt"))
    );
    assert_eq!(installer.calls(), 0);
}
