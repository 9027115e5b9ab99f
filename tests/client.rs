mod support;

use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Instant};

use rustdis_client::commands::SetOptions;
use rustdis_client::request::POOL_EXHAUSTED;
use rustdis_client::{
    Client, ClientConfig, ClientError, Command, Object, ReplyKind, ReplyShape, Value, ValueKind,
    Verb,
};
use support::{closed_port, MockServer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    visits: u32,
}

fn config(max_connections: usize) -> ClientConfig {
    ClientConfig {
        max_connections,
        // Keep probes out of the way unless a test asks for them.
        health_check_interval: Duration::from_secs(3600),
        dispatch_workers: 2,
        ..ClientConfig::default()
    }
}

async fn client_for(server: &MockServer) -> Client {
    let client = Client::new(config(8));
    client.add_write_host("127.0.0.1", server.port);
    client
}

#[tokio::test]
async fn set_get_del() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let session = Session {
        user: "ada".to_string(),
        visits: 3,
    };
    client.set("session", &session).await.unwrap();
    assert_eq!(
        client.get::<Session>("session").await.unwrap(),
        Some(session)
    );

    assert_eq!(client.del(&["session"]).await.unwrap(), 1);
    assert_eq!(client.get::<Session>("session").await.unwrap(), None);
    assert_eq!(client.del(&["session"]).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_key_is_null_not_an_error() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let reply = client
        .execute(&Command::new(Verb::Get).arg("nope"), ReplyShape::text())
        .await;

    assert!(!reply.is_error());
    assert!(reply.is_null());
    assert_eq!(client.get_string("nope").await.unwrap(), None);
}

#[tokio::test]
async fn strings_and_counters() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    client.set_string("greeting", "hello").await.unwrap();
    assert_eq!(
        client.get_string("greeting").await.unwrap().as_deref(),
        Some("hello")
    );

    assert_eq!(client.incr("hits").await.unwrap(), 1);
    assert_eq!(client.incrby("hits", 41).await.unwrap(), 42);
    assert_eq!(client.exists(&["hits", "greeting", "nope"]).await.unwrap(), 2);
}

#[tokio::test]
async fn set_with_condition_reports_whether_it_stored() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let nx = || SetOptions::default().only_if(rustdis_client::commands::SetCondition::NotExists);

    assert!(client.set_with("lock", "a", nx()).await.unwrap());
    assert!(!client.set_with("lock", "b", nx()).await.unwrap());
    assert_eq!(client.get::<String>("lock").await.unwrap().as_deref(), Some("a"));
}

#[tokio::test]
async fn mget_reads_each_slot_into_its_own_type() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    client.set_string("name", "ada").await.unwrap();
    client.incrby("visits", 7).await.unwrap();
    client
        .set("tags", &vec!["admin".to_string(), "ops".to_string()])
        .await
        .unwrap();

    let (name, visits, tags, missing): (
        Option<String>,
        Option<i64>,
        Option<Object<Vec<String>>>,
        Option<String>,
    ) = client
        .mget(&["name", "visits", "tags", "missing"])
        .await
        .unwrap();

    assert_eq!(name.as_deref(), Some("ada"));
    assert_eq!(visits, Some(7));
    assert_eq!(
        tags.map(Object::into_inner),
        Some(vec!["admin".to_string(), "ops".to_string()])
    );
    assert_eq!(missing, None);
}

#[tokio::test]
async fn mget_values_follows_the_given_kinds() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    client.set_string("a", "1").await.unwrap();
    client.set_string("b", "two").await.unwrap();

    let values = client
        .mget_values(&["a", "b", "c"], vec![ValueKind::Bytes, ValueKind::Text])
        .await
        .unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0], Value::Bytes("1".into()));
    assert_eq!(values[1], Value::Text("two".to_string()));
    assert_eq!(values[2], Value::Null);
}

#[tokio::test]
async fn hashes() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let added = client
        .hset("user:1", &[("name", "ada"), ("lang", "rust")])
        .await
        .unwrap();
    assert_eq!(added, 2);

    assert_eq!(
        client.hget::<String>("user:1", "lang").await.unwrap().as_deref(),
        Some("rust")
    );

    let all = client.hgetall::<String>("user:1").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["name"], "ada");
}

#[tokio::test]
async fn hash_table_fields_of_mixed_types() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let user = client.hash_table("user:2");

    assert_eq!(user.set("name", &"grace").await.unwrap(), 1);
    assert_eq!(user.set("name", &"ada").await.unwrap(), 0);
    user.mset(&[("age", 36), ("visits", 1)]).await.unwrap();

    assert!(user.setnx("lang", "rust").await.unwrap());
    assert!(!user.setnx("lang", "go").await.unwrap());
    assert_eq!(user.get::<String>("lang").await.unwrap().as_deref(), Some("rust"));

    let (name, age, missing): (Option<Object<String>>, Option<i64>, Option<i64>) =
        user.get_many(&["name", "age", "nope"]).await.unwrap();
    assert_eq!(name.map(Object::into_inner).as_deref(), Some("ada"));
    assert_eq!(age, Some(36));
    assert_eq!(missing, None);

    assert!(user.exists("age").await.unwrap());
    assert_eq!(user.len().await.unwrap(), 4);
    assert_eq!(user.keys().await.unwrap(), vec!["name", "age", "visits", "lang"]);
    // The JSON text of "ada", quotes included.
    assert_eq!(user.strlen("name").await.unwrap(), 5);
    assert_eq!(user.strlen("nope").await.unwrap(), 0);

    assert_eq!(user.incrby("visits", 2).await.unwrap(), 3);
    assert_eq!(user.incrbyfloat("age", 0.5).await.unwrap(), 36.5);

    assert_eq!(user.del(&["name", "lang", "nope"]).await.unwrap(), 2);
    assert_eq!(user.values::<f64>().await.unwrap(), vec![36.5, 3.0]);
}

#[tokio::test]
async fn sequence_orders_members_by_score() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let board = client.sequence("board");

    assert_eq!(
        board
            .add(&[(3.0, "carol"), (1.0, "alice"), (2.0, "bob")])
            .await
            .unwrap(),
        3
    );
    assert_eq!(board.add(&[(0.5, "bob")]).await.unwrap(), 0);

    assert_eq!(board.len().await.unwrap(), 3);
    assert_eq!(board.range(0, -1).await.unwrap(), vec!["bob", "alice", "carol"]);
    assert_eq!(board.score("bob").await.unwrap(), Some(0.5));
    assert_eq!(board.score("dave").await.unwrap(), None);
    assert_eq!(board.rank("carol").await.unwrap(), Some(2));
    assert_eq!(board.rank("dave").await.unwrap(), None);

    assert_eq!(board.incrby("alice", 5.0).await.unwrap(), 6.0);
    assert_eq!(board.range(-1, -1).await.unwrap(), vec!["alice"]);

    assert_eq!(board.rem(&["bob", "dave"]).await.unwrap(), 1);
    assert!(!board.is_empty().await.unwrap());
}

#[tokio::test]
async fn server_error_becomes_server_error() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    client.list::<u32>("numbers").rpush(&[1, 2]).await.unwrap();

    let err = client.get::<u32>("numbers").await.unwrap_err();
    assert!(matches!(err, ClientError::Server(ref msg) if msg.starts_with("WRONGTYPE")));

    // The connection stays usable after a server error.
    assert!(client.ping().await.unwrap());
    assert_eq!(server.accepted_connections(), 1);
}

#[tokio::test]
async fn malformed_reply_is_a_data_error_and_drops_the_connection() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let endpoint = client.router().get_write_host().unwrap();

    let reply = client
        .execute(&Command::custom("BADREPLY", false), ReplyShape::text())
        .await;

    assert_eq!(reply.kind(), ReplyKind::DataError);
    assert_eq!(endpoint.live_connections(), 0);

    assert!(client.ping().await.unwrap());
    assert_eq!(server.accepted_connections(), 2);
}

#[tokio::test]
async fn reply_cut_short_is_a_net_error() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let endpoint = client.router().get_write_host().unwrap();

    let err = client
        .call(Command::custom("HALFREPLY", false), ReplyShape::text())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Net(_)));
    assert_eq!(endpoint.live_connections(), 0);
    assert_eq!(endpoint.idle_connections(), 0);
}

#[tokio::test]
async fn cancelled_request_frees_its_connection_slot() {
    let server = MockServer::start().await;
    server.set_delay(Duration::from_millis(200));

    let client = Client::new(config(1));
    let endpoint = client.add_write_host("127.0.0.1", server.port);

    let cancelled = timeout(Duration::from_millis(50), client.get_string("k")).await;
    assert!(cancelled.is_err());
    assert_eq!(endpoint.live_connections(), 0);
    assert_eq!(endpoint.idle_connections(), 0);

    server.set_delay(Duration::ZERO);
    client.set_string("k", "v").await.unwrap();
    assert_eq!(client.get_string("k").await.unwrap().as_deref(), Some("v"));
    assert_eq!(endpoint.live_connections(), 1);
}

#[tokio::test]
async fn concurrent_requests_never_exceed_the_pool_ceiling() {
    const REQUESTS: usize = 40;
    const CEILING: usize = 4;

    let server = MockServer::start().await;
    server.set_delay(Duration::from_millis(5));

    let client = Client::new(config(CEILING));
    let endpoint = client.add_write_host("127.0.0.1", server.port);

    let tasks = (0..REQUESTS).map(|i| {
        let client = client.clone();
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            let key = format!("key:{}", i);
            // The pool refuses instead of queueing; the caller decides to try again.
            loop {
                assert!(endpoint.live_connections() <= CEILING);
                match client.set(&key, &i).await {
                    Ok(()) => return key,
                    Err(ClientError::Data(msg)) if msg == POOL_EXHAUSTED => {
                        sleep(Duration::from_millis(1)).await
                    }
                    Err(err) => panic!("request {} failed: {}", i, err),
                }
            }
        })
    });

    let keys: Vec<String> = join_all(tasks)
        .await
        .into_iter()
        .map(|task| task.unwrap())
        .collect();

    assert_eq!(keys.len(), REQUESTS);
    assert!(server.peak_connections() <= CEILING);
    assert!(endpoint.live_connections() <= CEILING);
    assert_eq!(endpoint.idle_connections(), endpoint.live_connections());

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(client.get::<usize>(key).await.unwrap(), Some(i));
    }
}

#[tokio::test]
async fn reads_go_to_read_hosts_and_writes_to_write_hosts() {
    let primary = MockServer::start().await;
    let replica = MockServer::start().await;

    let client = Client::new(config(8));
    client.add_write_host("127.0.0.1", primary.port);
    client.add_read_host("127.0.0.1", replica.port);

    client.set_string("k", "v").await.unwrap();
    assert_eq!(primary.requests(), 1);
    assert_eq!(replica.requests(), 0);

    // The replica is a separate keyspace in the mock.
    assert_eq!(client.get_string("k").await.unwrap(), None);
    assert_eq!(replica.requests(), 1);
}

#[tokio::test]
async fn reads_fall_back_to_the_write_host() {
    let primary = MockServer::start().await;
    let client = client_for(&primary).await;

    client.set_string("k", "v").await.unwrap();
    assert_eq!(client.get_string("k").await.unwrap().as_deref(), Some("v"));
    assert_eq!(primary.requests(), 2);
}

#[tokio::test]
async fn unavailable_endpoint_is_skipped_after_a_health_check() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    let client = Client::new(ClientConfig {
        health_check_interval: Duration::from_millis(20),
        ..config(8)
    });
    let down = client.add_write_host("127.0.0.1", first.port);
    client.add_write_host("127.0.0.1", second.port);

    client.set_string("k", "first").await.unwrap();
    first.stop();

    let deadline = Instant::now() + Duration::from_secs(5);
    while down.is_available() {
        assert!(Instant::now() < deadline, "endpoint never marked down");
        sleep(Duration::from_millis(10)).await;
    }

    client.set_string("k", "second").await.unwrap();
    assert_eq!(
        client.get_string("k").await.unwrap().as_deref(),
        Some("second")
    );
}

#[tokio::test]
async fn no_available_endpoint_is_a_net_error() {
    let client = Client::new(config(8));
    let endpoint = client.add_write_host("127.0.0.1", closed_port().await);
    endpoint.set_available(false);

    let err = client.get_string("k").await.unwrap_err();
    assert!(matches!(err, ClientError::Net(_)));
}

#[tokio::test]
async fn connection_refused_is_a_net_error() {
    let client = Client::new(config(8));
    let endpoint = client.add_write_host("127.0.0.1", closed_port().await);

    let err = client.get_string("k").await.unwrap_err();

    assert!(matches!(err, ClientError::Net(_)));
    assert_eq!(endpoint.live_connections(), 0);
}

#[tokio::test]
async fn database_is_selected_once_per_connection() {
    let server = MockServer::start().await;
    let client = Client::new(ClientConfig { db: 3, ..config(8) });
    client.add_write_host("127.0.0.1", server.port);

    assert!(client.ping().await.unwrap());
    assert!(client.ping().await.unwrap());

    // SELECT, PING, PING over one connection.
    assert_eq!(server.accepted_connections(), 1);
    assert_eq!(server.requests(), 3);
}

#[tokio::test]
async fn list_push_pop_and_range() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let jobs = client.list::<Session>("jobs");

    let a = Session {
        user: "a".to_string(),
        visits: 1,
    };
    let b = Session {
        user: "b".to_string(),
        visits: 2,
    };

    assert_eq!(jobs.rpush(&[a.clone(), b.clone()]).await.unwrap(), 2);
    assert_eq!(jobs.len().await.unwrap(), 2);
    assert_eq!(jobs.range(0, -1).await.unwrap(), vec![a.clone(), b.clone()]);
    assert_eq!(jobs.pop().await.unwrap(), Some(a));
    assert_eq!(jobs.rpop().await.unwrap(), Some(b));
    assert_eq!(jobs.pop().await.unwrap(), None);
    assert!(jobs.is_empty().await.unwrap());
}

#[tokio::test]
async fn blocking_pop_drops_the_key() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let jobs = client.list::<String>("jobs");

    jobs.rpush(&["first".to_string()]).await.unwrap();

    assert_eq!(jobs.blpop(1).await.unwrap().as_deref(), Some("first"));
    // Nothing left: the server answers with a null array.
    assert_eq!(jobs.brpop(1).await.unwrap(), None);
}

#[tokio::test]
async fn blocking_pop_with_key_tells_which_list_served() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let jobs = client.list::<u32>("jobs");
    let urgent = client.list::<u32>("urgent");

    urgent.rpush(&[9]).await.unwrap();

    let served = timeout(
        Duration::from_secs(5),
        jobs.blpop_with_key(&["urgent"], 1),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(served, Some(("urgent".to_string(), 9)));
    assert_eq!(jobs.brpop_with_key(&["urgent"], 1).await.unwrap(), None);
}
