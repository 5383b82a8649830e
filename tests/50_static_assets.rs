mod common;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;

use tasas_bridge::testing::InMemorySheet;

#[tokio::test]
async fn serves_front_end_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("index.html"), "<h1>tasas</h1>")?;
    std::fs::write(dir.path().join("dashboard.html"), "<h1>dashboard</h1>")?;
    std::fs::create_dir(dir.path().join("js"))?;
    std::fs::write(dir.path().join("js/app.js"), "console.log('tasas');")?;

    let sheet = Arc::new(InMemorySheet::new(vec![]));
    let base_url = common::spawn_bridge(sheet, &common::unreachable_url(), dir.path()).await?;

    let res = reqwest::get(format!("{}/", base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "<h1>tasas</h1>");

    let res = reqwest::get(format!("{}/dashboard", base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "<h1>dashboard</h1>");

    let res = reqwest::get(format!("{}/js/app.js", base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "console.log('tasas');");

    let res = reqwest::get(format!("{}/missing.css", base_url)).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
