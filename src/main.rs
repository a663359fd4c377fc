use clap::Parser;
use tokio::sync::mpsc::unbounded_channel;
use transit_desert::core::ConfigProvider;
use transit_desert::utils::error::ErrorSeverity;
use transit_desert::utils::logger;
use transit_desert::{
    source_for, AppError, CliConfig, EventLoop, GeoJsonSceneSink, LocalStorage, MapRenderer,
    MeshLoader, RegionCatalog, Shell, StopParser, UserAction,
};

fn exit_code(e: &AppError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 使用者操作問題，不算失敗
        ErrorSeverity::Medium => 2,   // 資料問題，可重試
        ErrorSeverity::High => 1,     // 設定錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn report_failure(context: &str, e: &AppError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e).max(1));
}

// 單執行緒: 所有狀態變更都在同一個任務上依序處理
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format.as_str() {
        "json" => logger::init_json_logger(cli.verbose),
        _ => logger::init_cli_logger(cli.verbose),
    }

    tracing::info!("Starting transit-desert");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => report_failure("Configuration validation failed", &e),
    };

    let catalog = match RegionCatalog::from_file(config.regions_path()) {
        Ok(catalog) => catalog,
        Err(e) if cli.region.is_none() => {
            tracing::warn!(
                "Region catalog {} not loaded ({}), mesh overlay unavailable",
                config.regions_path(),
                e
            );
            RegionCatalog::default()
        }
        Err(e) => report_failure("Failed to load region catalog", &e),
    };
    tracing::info!("📁 {} regions available", catalog.len());

    let shell = Shell::new(catalog, config.batch_policy());
    let renderer = MapRenderer::new(config.render_settings());
    let parser = StopParser::new(config.stop_schema());
    let loader = MeshLoader::new(source_for(&config.mesh_location()), config.mesh_schema());
    let sink = GeoJsonSceneSink::new(LocalStorage::new("."), config.output_path());

    let (actions, inbox) = unbounded_channel();
    if !cli.stops.is_empty() {
        actions.send(UserAction::FilesSelected(cli.stops.clone()))?;
    }
    if let Some(region) = &cli.region {
        actions.send(UserAction::RegionSelected(region.clone()))?;
        actions.send(UserAction::FetchMesh)?;
    }
    actions.send(UserAction::Shutdown)?;

    let event_loop = EventLoop::new(shell, renderer, parser, LocalStorage::new("."), loader, sink);
    let report = match event_loop.run(inbox).await {
        Ok(report) => report,
        Err(e) => report_failure("Rendering failed", &e),
    };

    let state = &report.state;
    let mesh_cells = state.mesh().map_or(0, |m| m.len());
    let mesh_population = state.mesh().map_or(0.0, |m| m.total_population());
    tracing::info!(
        "✅ {} stops, {} mesh cells (population {}), {} renders",
        state.stops().len(),
        mesh_cells,
        mesh_population,
        report.stats.renders
    );
    println!("✅ {} stops displayed", state.stops().len());
    if let Some(mesh) = state.mesh() {
        println!("🗾 {} mesh cells for region {}", mesh.len(), mesh.region_code);
    }
    println!("📁 Scene saved to: {}", config.output_path());

    // 要求的網格沒有載入時用非零結束碼
    if cli.region.is_some() && state.mesh().is_none() {
        std::process::exit(2);
    }

    Ok(())
}
