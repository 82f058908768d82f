mod common;

use serde_json::json;

use common::*;
use notion_siyuan::diagnose;
use notion_siyuan::http::{ClientError, Pacer};
use notion_siyuan::siyuan::{AvColumn, AvSchema, BlockAttrs, SiYuanClient};

async fn setup() -> MockServer<SiYuanFixture> {
    siyuan_server(SiYuanFixture {
        notebooks: vec![notebook("nb-1", "Inbox"), notebook("nb-2", "Archive")],
        ..Default::default()
    })
    .await
}

mod envelope {
    use super::*;

    #[tokio::test]
    async fn unwraps_data() {
        let server = setup().await;
        let client = siyuan_client(&server);

        assert_eq!(client.version().await.expect("Failed to get version"), "3.1.0");

        let notebooks = client.list_notebooks().await.expect("Failed to list notebooks");
        let names: Vec<&str> = notebooks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Inbox", "Archive"]);
    }

    #[tokio::test]
    async fn sends_token_authorization() {
        let server = setup().await;
        siyuan_client(&server)
            .version()
            .await
            .expect("Failed to get version");

        let request = &server.requests_to("/api/system/version")[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.authorization.as_deref(), Some("token test-token"));
    }

    #[tokio::test]
    async fn nonzero_code_with_data_is_an_api_error() {
        let server = siyuan_server(SiYuanFixture {
            fail_doc_paths: vec!["/Broken".into()],
            ..Default::default()
        })
        .await;

        let err = siyuan_client(&server)
            .create_doc_with_md("nb-1", "/Broken", "# Broken")
            .await
            .unwrap_err();

        match err {
            ClientError::Api { code, msg } => {
                assert_eq!(code, -1);
                assert_eq!(msg, "create doc failed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let server = setup().await;
        let client = SiYuanClient::new(&server.url, "wrong", Pacer::default());

        let err = client.list_notebooks().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
    }
}

mod documents {
    use super::*;

    #[tokio::test]
    async fn creates_document_and_sets_attributes() {
        let server = setup().await;
        let client = siyuan_client(&server);

        let id = client
            .create_doc_with_md("nb-1", "/Tasks/Write docs", "# Write docs")
            .await
            .expect("Failed to create document");
        assert_eq!(id, "doc-1");

        let mut attrs = BlockAttrs::new();
        attrs.insert("custom-status".into(), "Done".into());
        client
            .set_block_attrs(&id, &attrs)
            .await
            .expect("Failed to set attributes");

        let stored = client.get_block_attrs(&id).await.expect("Failed to get attributes");
        assert_eq!(stored.get("custom-status").map(String::as_str), Some("Done"));

        let docs = server.with_fixture(|f| f.docs.clone());
        assert_eq!(docs[0].notebook, "nb-1");
        assert_eq!(docs[0].path, "/Tasks/Write docs");
        assert_eq!(docs[0].markdown, "# Write docs");
    }

    #[tokio::test]
    async fn lists_the_document_tree() {
        let server = setup().await;
        let client = siyuan_client(&server);
        for path in ["/Tasks/One", "/Tasks/Two"] {
            client
                .create_doc_with_md("nb-1", path, "# Doc")
                .await
                .expect("Failed to create document");
        }
        client
            .create_doc_with_md("nb-2", "/Elsewhere", "# Doc")
            .await
            .expect("Failed to create document");

        let tree = client
            .list_doc_tree("nb-1", "/")
            .await
            .expect("Failed to list doc tree");

        let ids: Vec<&str> = tree["tree"]
            .as_array()
            .expect("tree array")
            .iter()
            .filter_map(|node| node["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["doc-1", "doc-2"]);

        let request = &server.requests_to("/api/filetree/listDocTree")[0];
        assert_eq!(request.body, json!({ "notebook": "nb-1", "path": "/" }));
    }

    #[tokio::test]
    async fn creates_notebook() {
        let server = setup().await;
        let notebook = siyuan_client(&server)
            .create_notebook("Notion Migration")
            .await
            .expect("Failed to create notebook");

        assert_eq!(notebook.id, "nb-created-3");
        assert_eq!(notebook.name, "Notion Migration");
    }

    #[tokio::test]
    async fn creates_snapshot_with_memo() {
        let server = setup().await;
        siyuan_client(&server)
            .create_snapshot("before migration")
            .await
            .expect("Failed to create snapshot");

        let request = &server.requests_to("/api/repo/createSnapshot")[0];
        assert_eq!(request.body, json!({ "memo": "before migration" }));
    }
}

mod attribute_views {
    use super::*;

    fn schema() -> AvSchema {
        AvSchema {
            columns: vec![AvColumn {
                name: "Status".into(),
                column_type: "select".into(),
                options: vec!["Todo".into(), "Done".into()],
                relation_db_id: None,
            }],
        }
    }

    #[tokio::test]
    async fn returns_view_id_when_supported() {
        let server = siyuan_server(SiYuanFixture {
            attribute_views: true,
            ..Default::default()
        })
        .await;

        let id = siyuan_client(&server)
            .create_attribute_view("nb-1", "Tasks", &schema())
            .await
            .expect("Failed to create view");
        assert_eq!(id, "av-Tasks");

        let body = &server.requests_to("/api/av/createAttributeView")[0].body;
        assert_eq!(body["schema"]["columns"][0]["type"], "select");
        assert!(body["schema"]["columns"][0].get("relation_db_id").is_none());
    }

    #[tokio::test]
    async fn fails_when_unsupported() {
        let server = setup().await;
        let result = siyuan_client(&server)
            .create_attribute_view("nb-1", "Tasks", &schema())
            .await;
        assert!(matches!(result, Err(ClientError::Api { .. })));
    }
}

mod probes {
    use super::*;

    #[tokio::test]
    async fn reports_available_endpoints() {
        let server = setup().await;
        let results = diagnose::probe_siyuan(&siyuan_client(&server)).await;

        assert_eq!(results.len(), diagnose::siyuan_probes().len());
        let available: Vec<&str> = results
            .iter()
            .filter(|r| r.is_available())
            .map(|r| r.endpoint.as_str())
            .collect();
        assert_eq!(
            available,
            vec![
                "/system/version",
                "/notebook/lsNotebooks",
                "/repo/createSnapshot",
                "/filetree/listDocTree"
            ]
        );

        let report = diagnose::siyuan_report(&results);
        assert!(report.contains("/system/getConf\n   404 - not available"));
        assert!(report.contains("4/10 endpoints available"));
    }

    #[tokio::test]
    async fn unreachable_server_is_status_zero() {
        let client = SiYuanClient::new("http://127.0.0.1:1", TOKEN, Pacer::default());
        let result = client.probe("/system/version", json!({})).await;
        assert_eq!(result.status, 0);
        assert!(!result.is_available());
    }
}
