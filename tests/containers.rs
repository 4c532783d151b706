//! Reading containers through the public interface.

use atomreg::{CmsContainer, Container};
use atomreg::error::Element;

#[test]
fn registry_and_cms_share_certificates() {
    let registry = Container::decode(
        include_bytes!("../test-data/registry-implicit.p12")
    ).unwrap();
    let cms = CmsContainer::decode(
        include_bytes!("../test-data/signed.p7")
    ).unwrap();
    assert_eq!(
        registry.signer_certificate().unwrap(),
        cms.signer_certificate().unwrap()
    );
    assert_eq!(
        registry.bags()[0].cert_bag().unwrap().certificate().unwrap(),
        &cms.econtent_certs()[0]
    );
}

#[test]
fn reports_skipped_certificates() {
    // Replace the first certificate’s SEQUENCE tag inside its OCTET STRING.
    let mut data = include_bytes!(
        "../test-data/registry-implicit.p12"
    ).to_vec();
    assert_eq!(&data[1073..1078], b"\x04\x82\x01\x93\x30");
    data[1077] = 0x31;
    let registry = Container::decode(&data).unwrap();
    assert_eq!(registry.certificates().len(), 1);
    assert_eq!(registry.skipped().len(), 1);
    assert_eq!(registry.skipped()[0].element(), Element::Certificate);
    assert_eq!(registry.skipped()[0].index(), 0);

    // Without the signer’s certificate, the signer isn’t resolved.
    assert!(registry.signer_certificate().is_none());
    assert_eq!(registry.signers()[0].signer_index, None);
}

#[cfg(feature = "serde")]
#[test]
fn serialize_summaries() {
    let registry = Container::decode(
        include_bytes!("../test-data/registry-implicit.p12")
    ).unwrap();
    let json = serde_json::to_value(registry.bag_infos()).unwrap();
    assert_eq!(json[0]["bag_type"], "certBag");
    assert_eq!(json[0]["summary"]["serial"], "0100");
    assert_eq!(json[1]["cert_len"], 361);

    let json = serde_json::to_string(registry.signers()).unwrap();
    let signers: Vec<atomreg::cms::SignerSummary>
        = serde_json::from_str(&json).unwrap();
    assert_eq!(signers, registry.signers());
}
