use comgov_core::content::ParamValue;
use comgov_util_db::def_table;

def_table! {
    /// Current value of each `(module, key)` parameter
    params: (String, String) => ParamValue
}
