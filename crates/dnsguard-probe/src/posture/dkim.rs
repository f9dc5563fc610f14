//! DKIM selector records at `<selector>._domainkey.<domain>`.

use dnsguard_core::{CheckName, DomainName, Failure, PostureFinding, RecordType, Verdict};
use futures_util::future::join_all;

use super::{answer_data, tags, Evaluator};

/// One finding per selector, in the order given.
pub(super) async fn check(
    evaluator: &Evaluator,
    domain: &DomainName,
    selectors: &[String],
) -> Vec<PostureFinding> {
    join_all(
        selectors
            .iter()
            .map(|selector| check_selector(evaluator, domain, selector)),
    )
    .await
}

async fn check_selector(
    evaluator: &Evaluator,
    domain: &DomainName,
    selector: &str,
) -> PostureFinding {
    let name = match domain.child(&format!("{selector}._domainkey")) {
        Ok(name) => name.fqdn(),
        Err(e) => {
            let fallback = format!("{selector}._domainkey.{}", domain.fqdn());
            return PostureFinding::unknown(CheckName::Dkim, fallback, &Failure::from(e));
        }
    };
    match evaluator.fetch(&name, RecordType::TXT, false).await {
        Ok(response) => evaluate(&name, &answer_data(&response, RecordType::TXT)),
        Err(e) => PostureFinding::unknown(CheckName::Dkim, name, &Failure::from(e)),
    }
}

/// Derive the verdict for one selector from the TXT strings at `name`.
#[must_use]
pub fn evaluate(name: &str, txts: &[String]) -> PostureFinding {
    let key = txts.iter().find(|t| {
        tags(t)
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("v") && v.eq_ignore_ascii_case("DKIM1"))
    });

    let Some(key) = key else {
        return PostureFinding::new(
            CheckName::Dkim,
            name,
            Vec::new(),
            Verdict::Absent,
            "no DKIM key published for this selector",
        );
    };

    let revoked = tags(key)
        .iter()
        .any(|(k, v)| k.eq_ignore_ascii_case("p") && v.is_empty());
    let (verdict, explanation) = if revoked {
        (Verdict::Weak, "key revoked (empty p=)")
    } else {
        (Verdict::Present, "DKIM key published")
    };

    PostureFinding::new(CheckName::Dkim, name, vec![key.clone()], verdict, explanation)
}
