use futures::StreamExt;
use smartdocs_lib::stream::{
    channel, encode, AnswerRenderer, CodecError, ErrorKind, NdjsonDecoder, RateLimitInfo,
    RenderState, SinkError, SinkState, StreamEvent,
};

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn encode_all(events: &[StreamEvent]) -> TestResult<Vec<u8>> {
    let mut wire = Vec::new();
    for event in events {
        wire.extend_from_slice(&encode(event)?);
    }
    Ok(wire)
}

fn sample_answer() -> Vec<StreamEvent> {
    vec![
        StreamEvent::sources(vec!["guide.pdf".into(), "faq.md".into()]),
        StreamEvent::token("Smart"),
        StreamEvent::token("Docs answers\nfrom your \"documents\"."),
        StreamEvent::Done,
    ]
}

#[test]
fn every_event_is_one_line() -> TestResult<()> {
    for event in sample_answer() {
        let line = encode(&event)?;
        assert_eq!(line.last(), Some(&b'\n'));
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
    }
    Ok(())
}

#[test]
fn decoder_handles_any_chunk_split() -> TestResult<()> {
    let events = sample_answer();
    let wire = encode_all(&events)?;

    for chunk_size in 1..=wire.len() {
        let mut decoder = NdjsonDecoder::new();
        let mut decoded = Vec::new();
        for chunk in wire.chunks(chunk_size) {
            decoded.extend(decoder.feed(chunk)?);
        }
        decoder.finish()?;
        assert_eq!(decoded, events, "chunk size {chunk_size}");
    }
    Ok(())
}

#[test]
fn decoder_tolerates_crlf_and_blank_lines() -> TestResult<()> {
    let wire = b"\r\n{\"type\":\"sources\",\"sources\":[]}\r\n\n{\"type\":\"done\"}\r\n";
    let mut decoder = NdjsonDecoder::new();
    let decoded = decoder.feed(wire)?;
    decoder.finish()?;
    assert_eq!(decoded, vec![StreamEvent::sources(vec![]), StreamEvent::Done]);
    Ok(())
}

#[test]
fn decoder_reports_bad_line_number() {
    let mut decoder = NdjsonDecoder::new();
    let result = decoder.feed(b"{\"type\":\"done\"}\n{\"type\":\"bogus\"}\n");
    match result {
        Err(CodecError::Json { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a JSON error, got {other:?}"),
    }
}

#[test]
fn decoder_reports_truncated_tail() -> TestResult<()> {
    let mut decoder = NdjsonDecoder::new();
    let decoded = decoder.feed(b"{\"type\":\"token\",\"text\":\"a\"}\n{\"type\":\"tok")?;
    assert_eq!(decoded, vec![StreamEvent::token("a")]);
    match decoder.finish() {
        Err(CodecError::Truncated(pending)) => assert_eq!(pending, 12),
        other => panic!("expected truncation, got {other:?}"),
    }
    Ok(())
}

#[test]
fn rate_limited_event_carries_retry_hint() -> TestResult<()> {
    let info = RateLimitInfo { limit: 10, remaining: 0, retry_after_secs: 42 };
    let line = encode(&StreamEvent::rate_limited(info))?;
    let value: serde_json::Value = serde_json::from_slice(&line)?;
    assert_eq!(value["type"], "error");
    assert_eq!(value["kind"], "rate_limited");
    assert_eq!(value["message"], "Too many requests. Please retry in 42 seconds.");
    assert_eq!(value["rate_limit"]["retry_after_secs"], 42);
    Ok(())
}

#[tokio::test]
async fn sink_delivers_in_order() -> TestResult<()> {
    let (mut sink, events) = channel(4);
    let producer = tokio::spawn(async move {
        for event in sample_answer() {
            sink.send(event).await?;
        }
        Ok::<_, SinkError>(sink.state())
    });

    let received: Vec<StreamEvent> = events.collect().await;
    assert_eq!(received, sample_answer());
    assert_eq!(producer.await??, SinkState::Terminated);
    Ok(())
}

#[tokio::test]
async fn sink_refuses_out_of_order_events() -> TestResult<()> {
    let (mut sink, _events) = channel(8);

    let early = sink.send(StreamEvent::token("too soon")).await;
    assert_eq!(early, Err(SinkError::OutOfOrder { event: "token", state: SinkState::Open }));

    sink.send(StreamEvent::sources(vec![])).await?;
    let twice = sink.send(StreamEvent::sources(vec![])).await;
    assert!(matches!(twice, Err(SinkError::OutOfOrder { event: "sources", .. })));

    sink.send(StreamEvent::error(ErrorKind::Generation, "boom")).await?;
    assert!(sink.is_terminated());
    let after = sink.send(StreamEvent::Done).await;
    assert!(matches!(after, Err(SinkError::OutOfOrder { state: SinkState::Terminated, .. })));
    Ok(())
}

#[tokio::test]
async fn error_may_precede_sources() -> TestResult<()> {
    let (mut sink, events) = channel(1);
    sink.send(StreamEvent::error(ErrorKind::Retrieval, "down")).await?;
    drop(sink);
    let received: Vec<StreamEvent> = events.collect().await;
    assert_eq!(received, vec![StreamEvent::error(ErrorKind::Retrieval, "down")]);
    Ok(())
}

#[tokio::test]
async fn dropping_consumer_closes_sink() -> TestResult<()> {
    let (mut sink, events) = channel(1);
    sink.send(StreamEvent::sources(vec![])).await?;
    drop(events);

    sink.closed().await;
    assert!(sink.is_closed());
    assert_eq!(sink.send(StreamEvent::token("lost")).await, Err(SinkError::Closed));
    assert!(sink.is_terminated());
    Ok(())
}

#[tokio::test]
async fn explicit_close_cancels_producer() -> TestResult<()> {
    let (mut sink, mut events) = channel(2);
    sink.send(StreamEvent::sources(vec![])).await?;
    events.close();
    assert!(sink.is_closed());
    assert_eq!(events.next().await, Some(StreamEvent::sources(vec![])));
    assert_eq!(events.next().await, None);
    Ok(())
}

#[test]
fn renderer_builds_answer_incrementally() {
    let mut renderer = AnswerRenderer::new();
    assert_eq!(renderer.state(), RenderState::Pending);

    let mut events = sample_answer().into_iter();
    for event in events.by_ref().take(2) {
        assert!(renderer.apply(event));
    }
    assert_eq!(renderer.state(), RenderState::Streaming);
    assert_eq!(renderer.text(), "Smart");
    assert_eq!(renderer.sources(), ["guide.pdf", "faq.md"]);

    for event in events {
        assert!(renderer.apply(event));
    }
    assert_eq!(renderer.state(), RenderState::Complete);
    assert_eq!(renderer.text(), "SmartDocs answers\nfrom your \"documents\".");
    assert!(!renderer.apply(StreamEvent::token("ignored")));
}

#[test]
fn renderer_keeps_partial_text_on_error() {
    let mut renderer = AnswerRenderer::default();
    renderer.apply(StreamEvent::sources(vec![]));
    renderer.apply(StreamEvent::token("Partial"));
    renderer.apply(StreamEvent::error(ErrorKind::Generation, "The model failed to answer."));

    assert_eq!(renderer.state(), RenderState::Failed);
    assert!(renderer.is_finished());
    assert_eq!(renderer.text(), "Partial");
    assert_eq!(renderer.error(), Some((ErrorKind::Generation, "The model failed to answer.")));
    assert!(!renderer.apply(StreamEvent::Done));
    assert_eq!(renderer.state(), RenderState::Failed);
}

#[test]
fn renderer_exposes_rate_limit() {
    let info = RateLimitInfo { limit: 3, remaining: 0, retry_after_secs: 5 };
    let mut renderer = AnswerRenderer::new();
    renderer.apply(StreamEvent::rate_limited(info));
    assert_eq!(renderer.rate_limit(), Some(&info));
    assert!(matches!(renderer.error(), Some((ErrorKind::RateLimited, _))));
}
