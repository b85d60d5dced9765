use parcel_tracker::{track_with, Provider, TrackerConfig};

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter("info,parcel_tracker=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(provider), Some(order_id)) = (args.next(), args.next()) else {
        eprintln!("使い方: track_demo <7-11|FamilyMart|OKMart|Tcat|Ecan|HCT|KTJ> <追跡番号>");
        std::process::exit(2);
    };

    let provider: Provider = match provider.parse() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    println!("=== {} {} ===", provider, order_id);

    match track_with(provider, &order_id, &TrackerConfig::default()).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("JSON 変換エラー: {}", e),
        },
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}
