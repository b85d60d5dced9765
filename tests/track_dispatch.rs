//! 全業者について、照会結果の order_id / platform が入力と一致することを確認する

use std::sync::Arc;

use async_trait::async_trait;
use parcel_tracker::{
    track_with, Endpoints, HttpSession, OcrEngine, OcrError, OcrProfile, Provider,
    TrackerConfig, TrackingResult,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 常に同じ文字列を返す OCR
struct FixedOcr(&'static str);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _image: &[u8], _profile: &OcrProfile) -> Result<String, OcrError> {
        Ok(self.0.to_string())
    }
}

async fn respond(server: &MockServer, verb: &str, route: &str, body: impl Into<Vec<u8>>) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.into()))
        .mount(server)
        .await;
}

async fn mock_all_providers() -> MockServer {
    let server = MockServer::start().await;

    // 7-11
    respond(
        &server,
        "GET",
        "/search.aspx",
        r#"<input id="__VIEWSTATE" value="vs" /><img src="ValidateImage.aspx?ts=1" />"#,
    )
    .await;
    respond(&server, "GET", "/ValidateImage.aspx", b"img".to_vec()).await;
    respond(
        &server,
        "POST",
        "/search.aspx",
        r#"<div class="m_news">包裹已寄件 2024/01/01 09:00:00</div><div class="info"></div>"#,
    )
    .await;

    // FamilyMart
    let inner = json!({ "List": [{ "STATUS_D": "貨件已寄件", "ORDER_DATE_R": "2024/01/01 09:00" }] });
    respond(
        &server,
        "POST",
        "/GetOrderDetail",
        json!({ "d": inner.to_string() }).to_string(),
    )
    .await;

    // OKMart
    Mock::given(method("GET"))
        .and(path("/ValidateNumber.ashx"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "ValidateNumber=code=ZZ999; path=/"),
        )
        .mount(&server)
        .await;
    respond(
        &server,
        "GET",
        "/Result",
        r#"<span class="odNo">X</span><span class="status">配送中</span>"#,
    )
    .await;

    // Tcat
    respond(
        &server,
        "GET",
        "/TraceDetail.aspx",
        r#"<table class="tablelist"><tr><th>h</th></tr>
           <tr><td class="style1">配送中</td><td class="style1">2024/01/01 09:00</td><td class="style1">站</td></tr></table>"#,
    )
    .await;

    // Ecan
    respond(
        &server,
        "POST",
        "/DS_LINK.asp",
        r#"<table class="sheetList"><tbody class="ListStyle01">
           <tr><td>2024/01/01 09:00</td><td>配送中</td><td>說明</td><td>站</td></tr></tbody></table>"#,
    )
    .await;

    // HCT
    respond(
        &server,
        "GET",
        "/SearchGoods_n.aspx",
        r#"<input id="__VIEWSTATE" value="vs" /><img id="imgCode" src="code.aspx" />"#,
    )
    .await;
    respond(&server, "GET", "/code.aspx", b"img".to_vec()).await;
    respond(
        &server,
        "POST",
        "/SearchGoods_n.aspx",
        r#"<input name="no" value="n" /><input name="chk" value="c" />"#,
    )
    .await;
    respond(
        &server,
        "POST",
        "/SearchGoods.aspx",
        r#"<div class="grid-container"><div class="col_optime">2024/01/01 09:00</div>
           <div class="col_state"><span class="linkInv">配送中</span></div></div>"#,
    )
    .await;

    // KTJ
    let inner = json!({ "result": [{ "course": [{ "statusIdName": "配送中" }] }] });
    respond(
        &server,
        "POST",
        "/Handler.aspx",
        format!(
            "({{success:true,msg:{}}})",
            serde_json::to_string(&inner.to_string()).unwrap()
        ),
    )
    .await;

    server
}

async fn track_mocked(
    provider: Provider,
    order_id: &str,
    config: &TrackerConfig,
) -> TrackingResult {
    match provider {
        // キャプチャ付きの業者は OCR を差し替える
        Provider::SevenEleven | Provider::Hct => {
            let session = HttpSession::new(config).unwrap();
            provider
                .tracker_with_ocr(config, Arc::new(FixedOcr("1234")))
                .track(&session, order_id)
                .await
                .unwrap()
        }
        _ => track_with(provider, order_id, config).await.unwrap(),
    }
}

#[tokio::test]
async fn every_provider_echoes_order_id_and_platform() {
    let server = mock_all_providers().await;
    let config = TrackerConfig::default().with_endpoints(Endpoints::all(server.uri()));

    for provider in Provider::ALL {
        let order_id = "123456789012";
        let result = track_mocked(provider, order_id, &config).await;

        assert_eq!(result.order_id, order_id, "{provider}");
        assert_eq!(result.platform, provider, "{provider}");
        assert!(!result.status.is_empty(), "{provider}");
        assert!(!result.is_delivered, "{provider}");
    }
}
