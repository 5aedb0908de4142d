//! Named Character References
//!
//! The structural reader only knows the five XML predefined entities
//! (&lt; &gt; &amp; &quot; &apos;). XHTML templates routinely use the
//! HTML 4 named references (&copy; &nbsp; &mdash; ...), so every one of
//! those is rewritten to its numeric form before parsing.
//!
//! Also provides the escaping used when marshaling text and attributes.
//! Uses Cow for zero-copy when nothing needs rewriting.

use memchr::memchr;
use once_cell::sync::Lazy;
use std::borrow::Cow;
use std::collections::HashMap;

/// Named reference -> numeric reference, HTML 4 / XHTML 1.0 order
/// (Latin-1, symbols and Greek, special). The XML predefined entities
/// are absent on purpose.
pub static NAMED_ENTITIES: &[(&str, &str)] = &[
    // Latin-1
    ("&nbsp;", "&#160;"),
    ("&iexcl;", "&#161;"),
    ("&cent;", "&#162;"),
    ("&pound;", "&#163;"),
    ("&curren;", "&#164;"),
    ("&yen;", "&#165;"),
    ("&brvbar;", "&#166;"),
    ("&sect;", "&#167;"),
    ("&uml;", "&#168;"),
    ("&copy;", "&#169;"),
    ("&ordf;", "&#170;"),
    ("&laquo;", "&#171;"),
    ("&not;", "&#172;"),
    ("&shy;", "&#173;"),
    ("&reg;", "&#174;"),
    ("&macr;", "&#175;"),
    ("&deg;", "&#176;"),
    ("&plusmn;", "&#177;"),
    ("&sup2;", "&#178;"),
    ("&sup3;", "&#179;"),
    ("&acute;", "&#180;"),
    ("&micro;", "&#181;"),
    ("&para;", "&#182;"),
    ("&middot;", "&#183;"),
    ("&cedil;", "&#184;"),
    ("&sup1;", "&#185;"),
    ("&ordm;", "&#186;"),
    ("&raquo;", "&#187;"),
    ("&frac14;", "&#188;"),
    ("&frac12;", "&#189;"),
    ("&frac34;", "&#190;"),
    ("&iquest;", "&#191;"),
    ("&Agrave;", "&#192;"),
    ("&Aacute;", "&#193;"),
    ("&Acirc;", "&#194;"),
    ("&Atilde;", "&#195;"),
    ("&Auml;", "&#196;"),
    ("&Aring;", "&#197;"),
    ("&AElig;", "&#198;"),
    ("&Ccedil;", "&#199;"),
    ("&Egrave;", "&#200;"),
    ("&Eacute;", "&#201;"),
    ("&Ecirc;", "&#202;"),
    ("&Euml;", "&#203;"),
    ("&Igrave;", "&#204;"),
    ("&Iacute;", "&#205;"),
    ("&Icirc;", "&#206;"),
    ("&Iuml;", "&#207;"),
    ("&ETH;", "&#208;"),
    ("&Ntilde;", "&#209;"),
    ("&Ograve;", "&#210;"),
    ("&Oacute;", "&#211;"),
    ("&Ocirc;", "&#212;"),
    ("&Otilde;", "&#213;"),
    ("&Ouml;", "&#214;"),
    ("&times;", "&#215;"),
    ("&Oslash;", "&#216;"),
    ("&Ugrave;", "&#217;"),
    ("&Uacute;", "&#218;"),
    ("&Ucirc;", "&#219;"),
    ("&Uuml;", "&#220;"),
    ("&Yacute;", "&#221;"),
    ("&THORN;", "&#222;"),
    ("&szlig;", "&#223;"),
    ("&agrave;", "&#224;"),
    ("&aacute;", "&#225;"),
    ("&acirc;", "&#226;"),
    ("&atilde;", "&#227;"),
    ("&auml;", "&#228;"),
    ("&aring;", "&#229;"),
    ("&aelig;", "&#230;"),
    ("&ccedil;", "&#231;"),
    ("&egrave;", "&#232;"),
    ("&eacute;", "&#233;"),
    ("&ecirc;", "&#234;"),
    ("&euml;", "&#235;"),
    ("&igrave;", "&#236;"),
    ("&iacute;", "&#237;"),
    ("&icirc;", "&#238;"),
    ("&iuml;", "&#239;"),
    ("&eth;", "&#240;"),
    ("&ntilde;", "&#241;"),
    ("&ograve;", "&#242;"),
    ("&oacute;", "&#243;"),
    ("&ocirc;", "&#244;"),
    ("&otilde;", "&#245;"),
    ("&ouml;", "&#246;"),
    ("&divide;", "&#247;"),
    ("&oslash;", "&#248;"),
    ("&ugrave;", "&#249;"),
    ("&uacute;", "&#250;"),
    ("&ucirc;", "&#251;"),
    ("&uuml;", "&#252;"),
    ("&yacute;", "&#253;"),
    ("&thorn;", "&#254;"),
    ("&yuml;", "&#255;"),
    // Symbols, mathematical symbols and Greek letters
    ("&fnof;", "&#402;"),
    ("&Alpha;", "&#913;"),
    ("&Beta;", "&#914;"),
    ("&Gamma;", "&#915;"),
    ("&Delta;", "&#916;"),
    ("&Epsilon;", "&#917;"),
    ("&Zeta;", "&#918;"),
    ("&Eta;", "&#919;"),
    ("&Theta;", "&#920;"),
    ("&Iota;", "&#921;"),
    ("&Kappa;", "&#922;"),
    ("&Lambda;", "&#923;"),
    ("&Mu;", "&#924;"),
    ("&Nu;", "&#925;"),
    ("&Xi;", "&#926;"),
    ("&Omicron;", "&#927;"),
    ("&Pi;", "&#928;"),
    ("&Rho;", "&#929;"),
    ("&Sigma;", "&#931;"),
    ("&Tau;", "&#932;"),
    ("&Upsilon;", "&#933;"),
    ("&Phi;", "&#934;"),
    ("&Chi;", "&#935;"),
    ("&Psi;", "&#936;"),
    ("&Omega;", "&#937;"),
    ("&alpha;", "&#945;"),
    ("&beta;", "&#946;"),
    ("&gamma;", "&#947;"),
    ("&delta;", "&#948;"),
    ("&epsilon;", "&#949;"),
    ("&zeta;", "&#950;"),
    ("&eta;", "&#951;"),
    ("&theta;", "&#952;"),
    ("&iota;", "&#953;"),
    ("&kappa;", "&#954;"),
    ("&lambda;", "&#955;"),
    ("&mu;", "&#956;"),
    ("&nu;", "&#957;"),
    ("&xi;", "&#958;"),
    ("&omicron;", "&#959;"),
    ("&pi;", "&#960;"),
    ("&rho;", "&#961;"),
    ("&sigmaf;", "&#962;"),
    ("&sigma;", "&#963;"),
    ("&tau;", "&#964;"),
    ("&upsilon;", "&#965;"),
    ("&phi;", "&#966;"),
    ("&chi;", "&#967;"),
    ("&psi;", "&#968;"),
    ("&omega;", "&#969;"),
    ("&thetasym;", "&#977;"),
    ("&upsih;", "&#978;"),
    ("&piv;", "&#982;"),
    ("&bull;", "&#8226;"),
    ("&hellip;", "&#8230;"),
    ("&prime;", "&#8242;"),
    ("&Prime;", "&#8243;"),
    ("&oline;", "&#8254;"),
    ("&frasl;", "&#8260;"),
    ("&weierp;", "&#8472;"),
    ("&image;", "&#8465;"),
    ("&real;", "&#8476;"),
    ("&trade;", "&#8482;"),
    ("&alefsym;", "&#8501;"),
    ("&larr;", "&#8592;"),
    ("&uarr;", "&#8593;"),
    ("&rarr;", "&#8594;"),
    ("&darr;", "&#8595;"),
    ("&harr;", "&#8596;"),
    ("&crarr;", "&#8629;"),
    ("&lArr;", "&#8656;"),
    ("&uArr;", "&#8657;"),
    ("&rArr;", "&#8658;"),
    ("&dArr;", "&#8659;"),
    ("&hArr;", "&#8660;"),
    ("&forall;", "&#8704;"),
    ("&part;", "&#8706;"),
    ("&exist;", "&#8707;"),
    ("&empty;", "&#8709;"),
    ("&nabla;", "&#8711;"),
    ("&isin;", "&#8712;"),
    ("&notin;", "&#8713;"),
    ("&ni;", "&#8715;"),
    ("&prod;", "&#8719;"),
    ("&sum;", "&#8721;"),
    ("&minus;", "&#8722;"),
    ("&lowast;", "&#8727;"),
    ("&radic;", "&#8730;"),
    ("&prop;", "&#8733;"),
    ("&infin;", "&#8734;"),
    ("&ang;", "&#8736;"),
    ("&and;", "&#8743;"),
    ("&or;", "&#8744;"),
    ("&cap;", "&#8745;"),
    ("&cup;", "&#8746;"),
    ("&int;", "&#8747;"),
    ("&there4;", "&#8756;"),
    ("&sim;", "&#8764;"),
    ("&cong;", "&#8773;"),
    ("&asymp;", "&#8776;"),
    ("&ne;", "&#8800;"),
    ("&equiv;", "&#8801;"),
    ("&le;", "&#8804;"),
    ("&ge;", "&#8805;"),
    ("&sub;", "&#8834;"),
    ("&sup;", "&#8835;"),
    ("&nsub;", "&#8836;"),
    ("&sube;", "&#8838;"),
    ("&supe;", "&#8839;"),
    ("&oplus;", "&#8853;"),
    ("&otimes;", "&#8855;"),
    ("&perp;", "&#8869;"),
    ("&sdot;", "&#8901;"),
    ("&lceil;", "&#8968;"),
    ("&rceil;", "&#8969;"),
    ("&lfloor;", "&#8970;"),
    ("&rfloor;", "&#8971;"),
    ("&lang;", "&#9001;"),
    ("&rang;", "&#9002;"),
    ("&loz;", "&#9674;"),
    ("&spades;", "&#9824;"),
    ("&clubs;", "&#9827;"),
    ("&hearts;", "&#9829;"),
    ("&diams;", "&#9830;"),
    // Markup-significant and internationalization characters
    ("&OElig;", "&#338;"),
    ("&oelig;", "&#339;"),
    ("&Scaron;", "&#352;"),
    ("&scaron;", "&#353;"),
    ("&Yuml;", "&#376;"),
    ("&circ;", "&#710;"),
    ("&tilde;", "&#732;"),
    ("&ensp;", "&#8194;"),
    ("&emsp;", "&#8195;"),
    ("&thinsp;", "&#8201;"),
    ("&zwnj;", "&#8204;"),
    ("&zwj;", "&#8205;"),
    ("&lrm;", "&#8206;"),
    ("&rlm;", "&#8207;"),
    ("&ndash;", "&#8211;"),
    ("&mdash;", "&#8212;"),
    ("&lsquo;", "&#8216;"),
    ("&rsquo;", "&#8217;"),
    ("&sbquo;", "&#8218;"),
    ("&ldquo;", "&#8220;"),
    ("&rdquo;", "&#8221;"),
    ("&bdquo;", "&#8222;"),
    ("&dagger;", "&#8224;"),
    ("&Dagger;", "&#8225;"),
    ("&permil;", "&#8240;"),
    ("&lsaquo;", "&#8249;"),
    ("&rsaquo;", "&#8250;"),
    ("&euro;", "&#8364;"),
];

/// Longest reference in the table including `&` and `;` (`&thetasym;`)
const MAX_REFERENCE_LEN: usize = 10;

/// Lookup from full reference (`&copy;`) to numeric form, built once
static ENTITY_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| NAMED_ENTITIES.iter().copied().collect());

/// Look up the numeric replacement for a full named reference
#[inline]
pub fn numeric_reference(reference: &str) -> Option<&'static str> {
    ENTITY_INDEX.get(reference).copied()
}

/// Rewrite every named reference from the table to its numeric form
///
/// Returns Borrowed if the text has no `&` at all or none of its
/// references are in the table.
pub fn replace_named_entities(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr(b'&', bytes).is_none() {
        return Cow::Borrowed(input);
    }

    let mut result: Option<String> = None;
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + offset;
        let window_end = (amp + MAX_REFERENCE_LEN).min(bytes.len());
        let replacement = memchr(b';', &bytes[amp + 1..window_end])
            .map(|semi| amp + 1 + semi)
            .and_then(|semi| numeric_reference(&input[amp..=semi]).map(|num| (semi, num)));

        match replacement {
            Some((semi, numeric)) => {
                let out = result.get_or_insert_with(|| String::with_capacity(input.len()));
                out.push_str(&input[copied..amp]);
                out.push_str(numeric);
                copied = semi + 1;
                pos = semi + 1;
            }
            None => pos = amp + 1,
        }
    }

    match result {
        Some(mut out) => {
            out.push_str(&input[copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(input),
    }
}

/// Escape text for element content
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape_with(input, |b| matches!(b, b'<' | b'>' | b'&'))
}

/// Escape text for a double-quoted attribute value
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape_with(input, |b| matches!(b, b'<' | b'>' | b'&' | b'"'))
}

fn escape_with(input: &str, needs_escape: impl Fn(u8) -> bool) -> Cow<'_, str> {
    // Fast path: check if any escaping needed
    if !input.bytes().any(&needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' if needs_escape(b'"') => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
