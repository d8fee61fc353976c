use chatwire::{
    ChatClient, ChatParams, ChatwireError, ClientConfig, FileUpload, Message, StreamFrame,
};
use mockito::Matcher;
use serde_json::json;

fn client(base_url: &str) -> ChatClient {
    let config = ClientConfig::new("sk-test", base_url).with_defaults(128, 0.5);
    ChatClient::new(config).unwrap()
}

fn chunk(id: &str, content: &str) -> String {
    json!({
        "id": id,
        "object": "chat.completion.chunk",
        "created": 1700000000,
        "model": "gpt-4",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
    .to_string()
}

#[tokio::test]
async fn single_shot_chat_sends_normalized_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4",
            "temperature": 0.5,
            "max_tokens": 128,
            "n": 1,
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-4",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": [{"type": "text", "text": "Hi there"}]},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let params = ChatParams::new("gpt-4", vec![Message::user("Hello")]).with_temperature(7.0);
    let completion = client(&server.url()).chat(params).await.unwrap();

    assert_eq!(completion.content(), Some("Hi there".to_string()));
    assert!(completion.choices[0].message.content.as_items().is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn streaming_chat_yields_events_until_done() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(
        "data: {}\n\ndata: {}\n\n: keep-alive\n\ndata: [DONE]\n\n",
        chunk("c1", "Hel"),
        chunk("c2", "lo")
    );
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("accept", "text/event-stream")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let params = ChatParams::new("gpt-4", vec![Message::user("Hello")]).with_stream(true);
    let mut response = client(&server.url()).send_chat(params).await.unwrap();
    assert!(response.is_stream());

    let mut content = String::new();
    loop {
        match response.recv().await.unwrap() {
            StreamFrame::Chunk(chunk) => {
                content.push_str(chunk.choices[0].delta.content.as_deref().unwrap_or_default())
            }
            StreamFrame::End(last) => {
                assert!(last.is_none());
                break;
            }
        }
    }
    response.close();

    assert_eq!(content, "Hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn streaming_error_frame_stops_the_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(
        "data: {}\n\ndata: {{\"error\":{{\"message\":\"The server had an error\",\"type\":\"server_error\"}}}}\n\ndata: {}\n\n",
        chunk("c1", "a"),
        chunk("c2", "b")
    );
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let params = ChatParams::new("gpt-4", vec![Message::user("Hello")]).with_stream(true);
    let mut response = client(&server.url()).send_chat(params).await.unwrap();

    assert!(matches!(response.recv().await, Ok(StreamFrame::Chunk(_))));
    match response.recv().await {
        Err(ChatwireError::ErrorFrame { error, .. }) => {
            assert_eq!(error.unwrap().message, "The server had an error")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        response.recv().await,
        Err(ChatwireError::StreamClosed)
    ));
}

#[tokio::test]
async fn custom_path_is_used() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/deployments/gpt/chat")
        .with_status(200)
        .with_body(r#"{"id": "x", "choices": []}"#)
        .create_async()
        .await;

    let params = ChatParams::new("gpt-4", vec![Message::user("Hello")]);
    let mut response = client(&server.url())
        .send_chat_to("/deployments/gpt/chat", params)
        .await
        .unwrap();
    assert_eq!(response.get().await.unwrap().id, "x");
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_status_surfaces_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}}"#)
        .create_async()
        .await;

    let params = ChatParams::new("gpt-4", vec![Message::user("Hello")]);
    match client(&server.url()).send_chat(params).await {
        Err(ChatwireError::Api(error)) => assert_eq!(error.message, "Incorrect API key provided"),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn empty_messages_never_reach_the_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let result = client(&server.url())
        .send_chat(ChatParams::new("gpt-4", vec![]))
        .await;
    assert!(matches!(result, Err(ChatwireError::EmptyMessages)));
    mock.assert_async().await;
}

#[tokio::test]
async fn upload_and_retrieve_file() {
    let mut server = mockito::Server::new_async().await;
    let info = json!({
        "id": "file-1",
        "object": "file",
        "bytes": 3,
        "created_at": 1700000000,
        "filename": "data.jsonl",
        "purpose": "fine-tune"
    })
    .to_string();

    let upload = server
        .mock("POST", "/files")
        .match_header("authorization", "Bearer sk-test")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
        .with_status(200)
        .with_body(&info)
        .create_async()
        .await;
    let retrieve = server
        .mock("GET", "/files/file-1")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_body(&info)
        .create_async()
        .await;

    let client = client(&server.url());
    let uploaded = client
        .upload_file(FileUpload::new("fine-tune", "data.jsonl", b"{}\n".to_vec()))
        .await
        .unwrap();
    assert_eq!(uploaded.id, "file-1");

    let fetched = client.retrieve_file("file-1").await.unwrap();
    assert_eq!(fetched, uploaded);

    upload.assert_async().await;
    retrieve.assert_async().await;
}

#[tokio::test]
async fn retrieve_missing_file_returns_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/files/file-404")
        .with_status(404)
        .with_body(r#"{"error": {"message": "No such File object: file-404", "type": "invalid_request_error", "param": "id"}}"#)
        .create_async()
        .await;

    match client(&server.url()).retrieve_file("file-404").await {
        Err(ChatwireError::Api(error)) => assert!(error.message.contains("file-404")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn retrieve_file_gateway_failure_keeps_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/files/f1")
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    match client(&server.url()).retrieve_file("f1").await {
        Err(ChatwireError::Http { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "<html>Bad Gateway</html>");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
