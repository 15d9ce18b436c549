//! Topic name and topic filter handling: validation and wildcard
//! matching over `/`-separated levels, `+` matching a single level and
//! `#` matching the remainder of a topic.

/// Topic names and filters are length-prefixed with a u16 on the wire.
pub const MAX_TOPIC_LEN: usize = 65_535;

/// Checks a concrete topic name, as used in PUBLISH and will topics:
/// wildcards are not allowed anywhere.
pub fn check_topic(topic: &str) -> Result<(), crate::Error> {
    if topic.len() > MAX_TOPIC_LEN {
        return Err(crate::Error::InvalidTopic);
    }

    if topic.bytes().any(|b| b == b'+' || b == b'#') {
        return Err(crate::Error::InvalidTopic);
    }

    Ok(())
}

/// Checks a subscription filter: `+` must stand alone as a level and
/// `#` must be the final standalone level.
pub fn check_filter(filter: &str) -> Result<(), crate::Error> {
    let bytes = filter.as_bytes();

    if bytes.len() > MAX_TOPIC_LEN {
        return Err(crate::Error::InvalidTopic);
    }

    let mut prev = 0u8;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'+' {
            let next = bytes.get(i + 1).copied();
            if (prev != 0 && prev != b'/') || !matches!(next, None | Some(b'/')) {
                return Err(crate::Error::InvalidTopic);
            }
        } else if b == b'#' {
            if (prev != 0 && prev != b'/') || i + 1 != bytes.len() {
                return Err(crate::Error::InvalidTopic);
            }
        }

        prev = b;
    }

    Ok(())
}

/// Does `topic` match the subscription `filter`?
///
/// Byte-at-a-time scan with one cursor per string rather than a
/// split-into-levels comparison; the interplay between a zero-length
/// final `+` segment and the `/#` suffix rule depends on the scan
/// order. Topics starting with `$` are only matched by filters that
/// also start with `$`, keeping generic wildcards out of the reserved
/// namespace.
pub fn matches(filter: &str, topic: &str) -> bool {
    let sub = filter.as_bytes();
    let name = topic.as_bytes();
    let (slen, tlen) = (sub.len(), name.len());

    if slen > 0 && tlen > 0 && (sub[0] == b'$') != (name[0] == b'$') {
        return false;
    }

    let mut spos = 0;
    let mut tpos = 0;

    while spos < slen && tpos < tlen {
        if sub[spos] == name[tpos] {
            if tpos == tlen - 1
                && spos + 3 == slen
                && sub[spos + 1] == b'/'
                && sub[spos + 2] == b'#'
            {
                // e.g. "foo/#" matches "foo" itself
                return true;
            }

            spos += 1;
            tpos += 1;

            if spos == slen && tpos == tlen {
                return true;
            }

            if tpos == tlen && spos == slen - 1 && sub[spos] == b'+' {
                // trailing "+" against an exhausted topic: a
                // zero-length final segment still counts as a level
                return true;
            }
        } else if sub[spos] == b'+' {
            spos += 1;
            while tpos < tlen && name[tpos] != b'/' {
                tpos += 1;
            }
            if tpos == tlen && spos == slen {
                return true;
            }
        } else if sub[spos] == b'#' {
            return spos + 1 == slen;
        } else {
            return false;
        }
    }

    // leftovers on either side mean a mismatch; the multi-level
    // wildcard cases all returned inside the loop
    tpos == tlen && spos == slen
}
