// Copyright (C) 2026 EVM Debug Service Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Exercises the explorer client's rate-limit retry and the
//! source-map pipeline's unverified-contract fallback against a mocked
//! block explorer, without any live network or compiler dependency.

use debug_engine::{sourcemap::fetch_source_and_compiled, ExplorerClient};
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const CONTRACT_ADDRESS: &str = "0x00000000000000000000000000000000000badbeef";

#[tokio::test(flavor = "multi_thread")]
async fn get_source_code_info_retries_past_a_rate_limit_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Max rate limit reached"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": [{
                "SourceCode": "pragma solidity ^0.8.0; contract Foo {}",
                "ContractName": "Foo",
                "CompilerVersion": "v0.8.19+commit.7dd6d404",
                "OptimizationUsed": "1",
                "Runs": "200",
                "EVMVersion": "default",
            }],
        })))
        .mount(&mock_server)
        .await;

    let client = ExplorerClient::new(mock_server.uri(), 1, "test-key");
    let info = client.get_source_code_info(CONTRACT_ADDRESS).await.unwrap();

    assert_eq!(info.contract_name, "Foo");
    assert!(!info.is_standard_json);
    assert_eq!(info.compiler_version, "v0.8.19+commit.7dd6d404");
}

#[tokio::test(flavor = "multi_thread")]
async fn unverified_source_is_reported_as_not_verified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": [{ "SourceCode": "", "ContractName": "", "CompilerVersion": "", "OptimizationUsed": "0", "Runs": "0", "EVMVersion": "" }],
        })))
        .mount(&mock_server)
        .await;

    let client = ExplorerClient::new(mock_server.uri(), 1, "test-key");
    assert!(client.get_source_code_info(CONTRACT_ADDRESS).await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_source_and_compiled_falls_back_when_the_compiler_is_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": [{
                "SourceCode": "pragma solidity ^0.8.0; contract Foo {}",
                "ContractName": "Foo",
                "CompilerVersion": "v0.8.19+commit.7dd6d404",
                "OptimizationUsed": "0",
                "Runs": "0",
                "EVMVersion": "default",
            }],
        })))
        .mount(&mock_server)
        .await;

    let client = ExplorerClient::new(mock_server.uri(), 1, "test-key");
    let output_dir = tempfile::tempdir().unwrap();

    // No `solc/v0.8.19+commit.7dd6d404` binary exists in the test
    // sandbox, so compilation fails and the pipeline must degrade to
    // the unverified placeholder rather than propagate the error.
    let (bundle, record) = fetch_source_and_compiled(&client, CONTRACT_ADDRESS, output_dir.path()).await;

    assert_eq!(bundle.len(), 1);
    assert!(bundle.contains_key("unverified.sol"));
    assert_eq!(record.sources.get("0").map(String::as_str), Some("unverified.sol"));
}
