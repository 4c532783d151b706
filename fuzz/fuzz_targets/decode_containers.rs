#![no_main]

use libfuzzer_sys::fuzz_target;
use atomreg::{CmsContainer, Container};

fuzz_target!(|data: &[u8]| {
    let (which, data) = match data.split_first() {
        Some((first, data)) => (*first, data),
        None => return,
    };

    match which % 4 {
        0 => { let _ = Container::decode(data); },
        1 => { let _ = Container::from_pem_or_der(data); },
        2 => { let _ = CmsContainer::decode(data); },
        3 => { let _ = CmsContainer::from_pem_or_der(data); },
        _ => panic!("what?"),
    }
});
