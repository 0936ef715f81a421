use gosub_persist::{
    config::{ItemConfig, StorageConfig},
    cookies::{CookieOptions, Cookies, DefaultCookieDocument},
    storage::{
        AccessOptions, ExpiredEntry, InMemoryArea, LocalStorage, NotifyingArea, Resolution,
        SessionStorage, StorageScope,
    },
    StorageError,
};
use std::sync::Arc;
use time::Duration;

fn main() -> Result<(), StorageError> {
    env_logger::init();

    // Local storage sits on an area that tells us about every change
    let area = Arc::new(NotifyingArea::new(Arc::new(InMemoryArea::new()), StorageScope::Local));
    let mut changes = area.subscribe();
    let local = LocalStorage::new(area.clone());

    // Every item created from now on is prefixed with "demo" and tagged version 2
    local.set_global_config(
        StorageConfig::builder()
            .prefix("demo")
            .version("2")
            .build()?,
    );

    let greeting = local.item("greeting", Some("hello".to_string()), ItemConfig::default());
    println!("{} = {:?} (default)", greeting.effective_key(), greeting.get()?);

    greeting.set(&"bonjour".to_string())?;
    println!("{} = {:?}", greeting.effective_key(), greeting.get()?);

    // An entry that is already expired, renewed by the hook on read
    local.set("counter", &1u32, &AccessOptions::new().ttl(Duration::milliseconds(-1)))?;
    let renew = AccessOptions::<u32>::new().on_expired(|entry| {
        Resolution::Replace(ExpiredEntry { value: entry.value + 1, expire_at: None })
    });
    println!("counter = {:?}", local.get("counter", &renew)?);
    println!("local storage size: {}", local.size());

    while let Ok(ev) = changes.try_recv() {
        println!("change: {:?} {:?} -> {:?}", ev.key, ev.old_value, ev.new_value);
    }

    // Session storage on its own in-memory area
    let session = SessionStorage::new(Arc::new(InMemoryArea::new()));
    session.set("draft", &vec!["line one", "line two"])?;
    println!("draft = {:?}", session.get::<Vec<String>>("draft")?);

    // Cookies for a document
    let url = url::Url::parse("https://example.com/").expect("valid URL");
    let cookies = Cookies::new(Arc::new(DefaultCookieDocument::new(url)));
    cookies.set("theme", "dark", &CookieOptions::new().path("/").expire(Duration::days(30)))?;
    let lang = cookies.item("lang", "en", ItemConfig::default());
    println!("theme = {:?}, lang = {:?}", cookies.get("theme"), lang.get());

    Ok(())
}
